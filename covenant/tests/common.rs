#![allow(dead_code)]

use alloy::primitives::{address, Address};
use alloy::signers::local::PrivateKeySigner;
use covenant::environment::{builtin_environment, DeleGatorEnvironment};

/// Anvil development keys 0 and 1.
pub const OWNER_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const SECOND_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

pub const DELEGATOR: Address = address!("0x1234567890123456789012345678901234567890");
pub const DELEGATE: Address = address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8");
pub const TOKEN: Address = address!("0x6B175474E89094C44Da98b954EedeAC495271d0F");

pub const SEPOLIA: u64 = 11_155_111;

pub fn sepolia() -> DeleGatorEnvironment {
    builtin_environment(SEPOLIA, "1.3.0").expect("sepolia has a 1.3.0 deployment")
}

pub fn key(hex: &str) -> PrivateKeySigner {
    hex.parse().expect("valid test key")
}
