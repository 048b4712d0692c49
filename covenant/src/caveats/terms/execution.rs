use alloy::primitives::{Address, Bytes};
use alloy::sol_types::SolValue;
use ruint::aliases::U256;
use serde::{Deserialize, Serialize};

use crate::caveats::{expect_min_len, CaveatError, CaveatKind, TermsCodec};
use crate::primitives::codec::{TermsReader, TermsWriter, ADDRESS, WORD};

#[allow(missing_docs)]
mod abi {
    alloy::sol! {
        /// ERC-7579 execution as seen by the batch enforcers.
        struct Execution {
            address target;
            uint256 value;
            bytes callData;
        }
    }
}

/// A single call the delegate is allowed to make.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    /// Called contract.
    pub target: Address,
    /// Native value sent along.
    pub value: U256,
    /// Calldata of the call.
    pub call_data: Bytes,
}

impl From<&Execution> for abi::Execution {
    fn from(execution: &Execution) -> Self {
        Self {
            target: execution.target,
            value: execution.value,
            callData: execution.call_data.clone(),
        }
    }
}

impl From<abi::Execution> for Execution {
    fn from(execution: abi::Execution) -> Self {
        Self {
            target: execution.target,
            value: execution.value,
            call_data: execution.callData,
        }
    }
}

/// The single execution must match `execution` exactly.
///
/// Layout: `target`(20) ∥ `value`(32) ∥ `callData`, the ERC-7579 single execution packing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactExecutionTerms {
    /// The expected execution.
    pub execution: Execution,
}

impl TermsCodec for ExactExecutionTerms {
    const KIND: CaveatKind = CaveatKind::ExactExecution;

    fn encode_terms(&self) -> Result<Vec<u8>, CaveatError> {
        Ok(TermsWriter::new()
            .address(self.execution.target)
            .word(self.execution.value)
            .bytes(&self.execution.call_data)
            .finish())
    }

    fn decode_terms(terms: &[u8]) -> Result<Self, CaveatError> {
        expect_min_len(Self::KIND, terms, ADDRESS + WORD)?;
        let mut reader = TermsReader::new(terms);
        Ok(Self {
            execution: Execution {
                target: reader.address()?,
                value: reader.word()?,
                call_data: Bytes::copy_from_slice(reader.rest()),
            },
        })
    }
}

fn encode_batch(kind: CaveatKind, executions: &[Execution]) -> Result<Vec<u8>, CaveatError> {
    if executions.is_empty() {
        return Err(CaveatError::invalid(
            kind,
            "executions",
            "at least one execution is required",
        ));
    }
    let executions: Vec<abi::Execution> = executions.iter().map(Into::into).collect();
    Ok(executions.abi_encode())
}

fn decode_batch(kind: CaveatKind, terms: &[u8]) -> Result<Vec<Execution>, CaveatError> {
    // offset word, length word
    expect_min_len(kind, terms, 2 * WORD)?;
    let executions = Vec::<abi::Execution>::abi_decode(terms)
        .map_err(|e| CaveatError::invalid(kind, "executions", e.to_string()))?;
    if executions.is_empty() {
        return Err(CaveatError::invalid(
            kind,
            "executions",
            "at least one execution is required",
        ));
    }
    // the decoder tolerates trailing bytes and short padding, the enforcer's layout does not
    let canonical = executions.abi_encode();
    if canonical.len() != terms.len() {
        return Err(CaveatError::TermsLengthMismatch {
            kind,
            expected: canonical.len().to_string(),
            actual: terms.len(),
        });
    }
    if canonical != terms {
        return Err(CaveatError::invalid(
            kind,
            "executions",
            "terms are not a canonical Execution[] encoding",
        ));
    }
    Ok(executions.into_iter().map(Into::into).collect())
}

/// The batch must match `executions` exactly, same size and order.
///
/// Layout: `abi.encode(Execution[])`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactExecutionBatchTerms {
    /// Expected executions, at least one.
    pub executions: Vec<Execution>,
}

impl TermsCodec for ExactExecutionBatchTerms {
    const KIND: CaveatKind = CaveatKind::ExactExecutionBatch;

    fn encode_terms(&self) -> Result<Vec<u8>, CaveatError> {
        encode_batch(Self::KIND, &self.executions)
    }

    fn decode_terms(terms: &[u8]) -> Result<Self, CaveatError> {
        decode_batch(Self::KIND, terms).map(|executions| Self { executions })
    }
}

/// Like [`ExactExecutionBatchTerms`], but the enforcer only compares calldata.
///
/// The target and value of each entry are still encoded; the enforcer ignores them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactCalldataBatchTerms {
    /// Expected executions, at least one.
    pub executions: Vec<Execution>,
}

impl TermsCodec for ExactCalldataBatchTerms {
    const KIND: CaveatKind = CaveatKind::ExactCalldataBatch;

    fn encode_terms(&self) -> Result<Vec<u8>, CaveatError> {
        encode_batch(Self::KIND, &self.executions)
    }

    fn decode_terms(terms: &[u8]) -> Result<Self, CaveatError> {
        decode_batch(Self::KIND, terms).map(|executions| Self { executions })
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{address, bytes};

    use super::*;

    fn transfer() -> Execution {
        Execution {
            target: address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8"),
            value: U256::from(1_000),
            call_data: bytes!("0xdeadbeef"),
        }
    }

    #[test]
    fn test_exact_execution_packed_layout() {
        let terms = ExactExecutionTerms {
            execution: transfer(),
        };
        let encoded = terms.encode_terms().unwrap();
        assert_eq!(encoded.len(), 20 + 32 + 4);
        assert_eq!(&encoded[..20], transfer().target.as_slice());
        assert_eq!(&encoded[50..52], &[0x03, 0xe8]);
        assert_eq!(&encoded[52..], &[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(ExactExecutionTerms::decode_terms(&encoded).unwrap(), terms);
    }

    #[test]
    fn test_exact_execution_batch_is_abi_array() {
        let terms = ExactExecutionBatchTerms {
            executions: vec![transfer(), transfer()],
        };
        let encoded = terms.encode_terms().unwrap();
        // head offset to the array, then its length
        assert_eq!(U256::from_be_slice(&encoded[..32]), U256::from(32));
        assert_eq!(U256::from_be_slice(&encoded[32..64]), U256::from(2));
        assert_eq!(ExactExecutionBatchTerms::decode_terms(&encoded).unwrap(), terms);
    }

    #[test]
    fn test_batches_reject_empty_and_truncated() {
        assert!(ExactCalldataBatchTerms { executions: vec![] }
            .encode_terms()
            .is_err());

        let encoded = ExactCalldataBatchTerms {
            executions: vec![transfer()],
        }
        .encode_terms()
        .unwrap();
        assert!(matches!(
            ExactCalldataBatchTerms::decode_terms(&encoded[..encoded.len() - 1]).unwrap_err(),
            CaveatError::TermsLengthMismatch { .. } | CaveatError::InvalidTerms { .. }
        ));
        assert!(matches!(
            ExactCalldataBatchTerms::decode_terms(&[0u8; 8]).unwrap_err(),
            CaveatError::TermsLengthMismatch { .. }
        ));
    }

    #[test]
    fn test_batches_reject_trailing_bytes() {
        let encoded = ExactExecutionBatchTerms {
            executions: vec![transfer()],
        }
        .encode_terms()
        .unwrap();
        // offset, length, element offset, three head words, calldata length and one padded word
        assert_eq!(encoded.len(), 256);

        let mut padded = encoded.clone();
        padded.extend_from_slice(&[0xde; 32]);
        assert!(matches!(
            ExactExecutionBatchTerms::decode_terms(&padded).unwrap_err(),
            CaveatError::TermsLengthMismatch {
                actual: 288,
                ..
            }
        ));
        assert!(ExactExecutionBatchTerms::decode_terms(&encoded[..255]).is_err());
        assert!(ExactExecutionBatchTerms::decode_terms(&encoded).is_ok());
    }
}
