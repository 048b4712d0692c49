use alloy::primitives::{Address, Bytes, B256};
use serde::{Deserialize, Serialize};

use crate::caveats::{expect_len, expect_min_len, expect_multiple_of, CaveatError, CaveatKind, TermsCodec};
use crate::primitives::codec::{TermsReader, TermsWriter, ADDRESS, WORD};

fn encode_addresses(
    kind: CaveatKind,
    field: &'static str,
    addresses: &[Address],
) -> Result<Vec<u8>, CaveatError> {
    if addresses.is_empty() {
        return Err(CaveatError::invalid(kind, field, "at least one address is required"));
    }
    Ok(addresses
        .iter()
        .fold(TermsWriter::new(), |writer, address| writer.address(*address))
        .finish())
}

fn decode_addresses(kind: CaveatKind, terms: &[u8]) -> Result<Vec<Address>, CaveatError> {
    expect_multiple_of(kind, terms, ADDRESS)?;
    Ok(terms.chunks_exact(ADDRESS).map(Address::from_slice).collect())
}

/// Executions may only call one of `targets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowedTargetsTerms {
    /// Callable contracts, at least one.
    pub targets: Vec<Address>,
}

impl TermsCodec for AllowedTargetsTerms {
    const KIND: CaveatKind = CaveatKind::AllowedTargets;

    fn encode_terms(&self) -> Result<Vec<u8>, CaveatError> {
        encode_addresses(Self::KIND, "targets", &self.targets)
    }

    fn decode_terms(terms: &[u8]) -> Result<Self, CaveatError> {
        decode_addresses(Self::KIND, terms).map(|targets| Self { targets })
    }
}

/// Only one of `redeemers` may redeem the delegation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemerTerms {
    /// Accepted redeemers, at least one.
    pub redeemers: Vec<Address>,
}

impl TermsCodec for RedeemerTerms {
    const KIND: CaveatKind = CaveatKind::Redeemer;

    fn encode_terms(&self) -> Result<Vec<u8>, CaveatError> {
        encode_addresses(Self::KIND, "redeemers", &self.redeemers)
    }

    fn decode_terms(terms: &[u8]) -> Result<Self, CaveatError> {
        decode_addresses(Self::KIND, terms).map(|redeemers| Self { redeemers })
    }
}

/// Only `transferOwnership` on `contract_address` may be called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipTransferTerms {
    /// The owned contract.
    pub contract_address: Address,
}

impl TermsCodec for OwnershipTransferTerms {
    const KIND: CaveatKind = CaveatKind::OwnershipTransfer;

    fn encode_terms(&self) -> Result<Vec<u8>, CaveatError> {
        Ok(TermsWriter::new().address(self.contract_address).finish())
    }

    fn decode_terms(terms: &[u8]) -> Result<Self, CaveatError> {
        expect_len(Self::KIND, terms, ADDRESS)?;
        Ok(Self {
            contract_address: Address::from_slice(terms),
        })
    }
}

/// Deploys `bytecode` with CREATE2 at `contract_address` before the execution if nothing is there yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployedTerms {
    /// Expected deployment address.
    pub contract_address: Address,
    /// CREATE2 salt.
    pub salt: B256,
    /// Creation bytecode, never empty.
    pub bytecode: Bytes,
}

impl TermsCodec for DeployedTerms {
    const KIND: CaveatKind = CaveatKind::Deployed;

    fn encode_terms(&self) -> Result<Vec<u8>, CaveatError> {
        if self.bytecode.is_empty() {
            return Err(CaveatError::invalid(Self::KIND, "bytecode", "must not be empty"));
        }
        Ok(TermsWriter::new()
            .address(self.contract_address)
            .bytes(self.salt.as_slice())
            .bytes(&self.bytecode)
            .finish())
    }

    fn decode_terms(terms: &[u8]) -> Result<Self, CaveatError> {
        expect_min_len(Self::KIND, terms, ADDRESS + WORD + 1)?;
        let mut reader = TermsReader::new(terms);
        Ok(Self {
            contract_address: reader.address()?,
            salt: reader.fixed::<WORD>()?,
            bytecode: Bytes::copy_from_slice(reader.rest()),
        })
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{address, b256, bytes};

    use super::*;

    #[test]
    fn test_allowed_targets_concatenates_addresses() {
        let terms = AllowedTargetsTerms {
            targets: vec![
                address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8"),
                address!("0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC"),
            ],
        };
        let encoded = terms.encode_terms().unwrap();
        assert_eq!(encoded.len(), 40);
        assert_eq!(AllowedTargetsTerms::decode_terms(&encoded).unwrap(), terms);
        assert!(AllowedTargetsTerms::decode_terms(&encoded[..39]).is_err());
        assert!(AllowedTargetsTerms { targets: vec![] }.encode_terms().is_err());
    }

    #[test]
    fn test_redeemer_rejects_empty_terms() {
        assert!(matches!(
            RedeemerTerms::decode_terms(&[]).unwrap_err(),
            CaveatError::TermsLengthMismatch { kind: CaveatKind::Redeemer, actual: 0, .. }
        ));
    }

    #[test]
    fn test_deployed_layout() {
        let terms = DeployedTerms {
            contract_address: address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8"),
            salt: b256!("0x0000000000000000000000000000000000000000000000000000000000000001"),
            bytecode: bytes!("0x6080"),
        };
        let encoded = terms.encode_terms().unwrap();
        assert_eq!(encoded.len(), 54);
        assert_eq!(DeployedTerms::decode_terms(&encoded).unwrap(), terms);

        let empty = DeployedTerms {
            bytecode: Bytes::new(),
            ..terms
        };
        assert!(empty.encode_terms().is_err());
    }
}
