//! Known deployments of the delegation framework.
//!
//! Contracts are deployed through a deterministic CREATE2 factory, so one
//! version has the same addresses on every supported chain.
//!
//! Reference: <https://github.com/MetaMask/delegation-framework/blob/main/documents/Deployments.md>

use std::collections::HashMap;

use alloy::primitives::{address, Address};

use super::{DeleGatorEnvironment, Implementations};
use crate::caveats::CaveatKind;
use crate::primitives::Network;

/// Framework versions with a built-in deployment table.
pub const SUPPORTED_VERSIONS: [&str; 1] = ["1.3.0"];

const V1_3_0_DELEGATION_MANAGER: Address = address!("0xdb9B1e94B5b69Df7e401DDbedE43491141047dB3");
const V1_3_0_ENTRY_POINT: Address = address!("0x0000000071727De22E5E9d8BAf0edAc6f37da032");
const V1_3_0_SIMPLE_FACTORY: Address = address!("0x69Aa2f9fe1572F1B640E1bbc512f5c3a734fc77c");

const V1_3_0_IMPLEMENTATIONS: Implementations = Implementations {
    multi_sig: address!("0x56a9EdB16a0105eb5a4C54f4C062e2868844f3A7"),
    hybrid: address!("0x48dBe696A4D990079e039489bA2053B36E8FFEC4"),
    eip7702_stateless: address!("0x63c0c19a282a1B52b07dD5a65b58948A07DAE32B"),
};

const V1_3_0_ENFORCERS: [(CaveatKind, Address); 31] = [
    (CaveatKind::AllowedCalldata, address!("0xc2b0d624c1c4319760C96503BA27C347F3260f55")),
    (CaveatKind::AllowedMethods, address!("0x2c21fD0Cb9DC8445CB3fb0DC5E7Bb0Aca01842B5")),
    (CaveatKind::AllowedTargets, address!("0x7F20f61b1f09b08D970938F6fa563634d65c4EeB")),
    (CaveatKind::ArgsEqualityCheck, address!("0x44B8C6ae3C304213c3e298495e12497Ed3E56E41")),
    (CaveatKind::BlockNumber, address!("0x5d9818dF0AE3f66e9c3D0c5029DAF99d1823ca6c")),
    (CaveatKind::Deployed, address!("0x24ff2AA430D53a8CD6788018E902E098083dcCd2")),
    (CaveatKind::Erc20BalanceChange, address!("0xcdF6aB796408598Cea671d79506d7D48E97a5437")),
    (CaveatKind::Erc20TransferAmount, address!("0xf100b0819427117EcF76Ed94B358B1A5b5C6D2Fc")),
    (CaveatKind::Erc20PeriodTransfer, address!("0x474e3Ae7E169e940607cC624Da8A15Eb120139aB")),
    (CaveatKind::Erc20Streaming, address!("0x56c97aE02f233B29fa03502Ecc0457266d9be00e")),
    (CaveatKind::Erc721BalanceChange, address!("0x8aFdf96eDBbe7e1eD3f5Cd89C7E084841e12A09e")),
    (CaveatKind::Erc721Transfer, address!("0x3790e6B7233f779b09DA74C72b6e94813925b9aF")),
    (CaveatKind::Erc1155BalanceChange, address!("0x63c322732695cAFbbD488Fc6937A0A7B66fC001A")),
    (CaveatKind::ExactCalldataBatch, address!("0x982FD5C86BBF425d7d1451f974192d4525113DfD")),
    (CaveatKind::ExactCalldata, address!("0x99F2e9bF15ce5eC84685604836F71aB835DBBdED")),
    (CaveatKind::ExactExecutionBatch, address!("0x1e141e455d08721Dd5BCDA1BaA6Ea5633Afd5017")),
    (CaveatKind::ExactExecution, address!("0x146713078D39eCC1F5338309c28405ccf85Abfbb")),
    (CaveatKind::Id, address!("0xC8B5D93463c893401094cc70e66A206fb5987997")),
    (CaveatKind::LimitedCalls, address!("0x04658B29F6b82ed55274221a06Fc97D318E25416")),
    (CaveatKind::MultiTokenPeriod, address!("0xFB2f1a9BD76d3701B730E5d69C3219D42D80eBb7")),
    (CaveatKind::NativeBalanceChange, address!("0xbD7B277507723490Cd50b12EaaFe87C616be6880")),
    (CaveatKind::NativeTokenPayment, address!("0x4803a326ddED6dDBc60e659e5ed12d85c7582811")),
    (CaveatKind::NativeTokenPeriodTransfer, address!("0x9BC0FAf4Aca5AE429F4c06aEEaC517520CB16BD9")),
    (CaveatKind::NativeTokenStreaming, address!("0xD10b97905a320b13a0608f7E9cC506b56747df19")),
    (CaveatKind::NativeTokenTransferAmount, address!("0xF71af580b9c3078fbc2BBF16FbB8EEd82b330320")),
    (CaveatKind::Nonce, address!("0xDE4f2FAC4B3D87A1d9953Ca5FC09FCa7F366254f")),
    (CaveatKind::OwnershipTransfer, address!("0x7EEf9734E7092032B5C56310Eb9BbD1f4A524681")),
    (CaveatKind::Redeemer, address!("0xE144b0b2618071B4E56f746313528a669c7E65c5")),
    (CaveatKind::SpecificActionErc20TransferBatch, address!("0x00e0251aaA263dfE3B3541B758A82D1CBA1c3B6D")),
    (CaveatKind::Timestamp, address!("0x1046bb45C8d673d4ea75321280DB34899413c069")),
    (CaveatKind::ValueLte, address!("0x92Bf12322527cAA612fd31a0e810472BBB106A8F")),
];

/// The built-in deployment of `version` on `chain_id`, if there is one.
#[must_use]
pub fn builtin_environment(chain_id: u64, version: &str) -> Option<DeleGatorEnvironment> {
    Network::from_chain_id(chain_id)?;
    match version {
        "1.3.0" => Some(DeleGatorEnvironment {
            chain_id,
            version: version.to_string(),
            delegation_manager: V1_3_0_DELEGATION_MANAGER,
            entry_point: V1_3_0_ENTRY_POINT,
            simple_factory: V1_3_0_SIMPLE_FACTORY,
            implementations: V1_3_0_IMPLEMENTATIONS,
            caveat_enforcers: HashMap::from(V1_3_0_ENFORCERS),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_every_kind_has_a_distinct_enforcer() {
        let kinds: HashSet<_> = V1_3_0_ENFORCERS.iter().map(|(kind, _)| *kind).collect();
        let addresses: HashSet<_> = V1_3_0_ENFORCERS.iter().map(|(_, address)| *address).collect();
        assert_eq!(kinds.len(), CaveatKind::ALL.len());
        assert_eq!(addresses.len(), CaveatKind::ALL.len());
    }

    #[test]
    fn test_same_addresses_on_every_network() {
        let mainnet = builtin_environment(Network::Ethereum.chain_id(), "1.3.0").unwrap();
        for network in Network::ALL {
            let environment = builtin_environment(network.chain_id(), "1.3.0").unwrap();
            assert_eq!(environment.delegation_manager, mainnet.delegation_manager);
            assert_eq!(environment.caveat_enforcers, mainnet.caveat_enforcers);
        }
    }
}
