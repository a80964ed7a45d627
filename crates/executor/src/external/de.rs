//! The json deserializable types

use lantern_common::CallResultValue;

use super::SubprocessError;
use crate::error::EngineFailure;

/// The engine loop responds with one of three shapes, told apart by `status`.
///
/// This is [`ChildResponse::refine`]'d into [`RefinedChildResponse`]
#[derive(serde::Deserialize, Debug)]
pub(super) struct ChildResponse<'a> {
    /// Describes the outcome with three alternatives (good, known error, trap)
    status: Status,
    /// The trap message when `status` is [`Status::Failed`].
    #[serde(borrow)]
    exception: Option<std::borrow::Cow<'a, str>>,
    /// Enumeration of "known errors", present when `status` is [`Status::Error`].
    kind: Option<ErrorKind>,
    /// Timing information, possibly available.
    #[serde(default)]
    timings: Timings,
    /// The real output from the contract when `status` is [`Status::Ok`].
    #[serde(default)]
    output: Option<Vec<CallResultValue>>,
}

impl<'a> ChildResponse<'a> {
    pub(super) fn refine(self) -> Result<RefinedChildResponse<'a>, SubprocessError> {
        let status = match (self.status, self.kind, self.exception, self.output) {
            (Status::Ok, None, None, Some(output)) => RefinedStatus::Ok(output),
            (Status::Error, Some(kind), None, None) => RefinedStatus::Error(kind),
            (Status::Failed, None, Some(exception), None) => RefinedStatus::Failed(exception),
            // these should not happen, so turn them into similar as serde_json errors
            _ => return Err(SubprocessError::InvalidResponse),
        };

        Ok(RefinedChildResponse {
            status,
            timings: self.timings,
        })
    }
}

impl RefinedChildResponse<'_> {
    pub(super) fn into_messages(
        self,
    ) -> (Timings, Status, Result<Vec<CallResultValue>, EngineFailure>) {
        match self.status {
            RefinedStatus::Ok(x) => (self.timings, Status::Ok, Ok(x)),
            RefinedStatus::Error(e) => (self.timings, Status::Error, Err(EngineFailure::from(e))),
            RefinedStatus::Failed(s) => (
                self.timings,
                Status::Failed,
                Err(EngineFailure::Trap(s.into_owned())),
            ),
        }
    }
}

/// Different kinds of errors the engine side recognizes.
#[derive(serde::Deserialize, Debug, PartialEq)]
pub(super) enum ErrorKind {
    #[serde(rename = "NO_SUCH_CONTRACT")]
    NoSuchContract,
    #[serde(rename = "INVALID_ENTRY_POINT")]
    InvalidEntryPoint,
    #[serde(rename = "INVALID_INPUT")]
    InvalidCommand,
}

impl From<ErrorKind> for EngineFailure {
    fn from(e: ErrorKind) -> Self {
        match e {
            ErrorKind::NoSuchContract => EngineFailure::NoSuchContract,
            ErrorKind::InvalidEntryPoint => EngineFailure::InvalidEntryPoint,
            ErrorKind::InvalidCommand => {
                EngineFailure::Internal(anyhow::anyhow!("Engine rejected the command as invalid"))
            }
        }
    }
}

#[derive(serde::Deserialize, PartialEq, Debug, Clone, Copy)]
pub(super) enum Status {
    /// No errors
    #[serde(rename = "ok")]
    Ok,
    /// Known error happened
    #[serde(rename = "error")]
    Error,
    /// Execution trapped
    #[serde(rename = "failed")]
    Failed,
}

/// Just something the engine internally recorded. Only logged.
#[derive(serde::Deserialize, Debug, Default)]
pub(super) struct Timings {
    /// Time it took to parse the command.
    pub parsing: Option<f64>,
    /// Time it took to load the class and execute.
    pub execution: Option<f64>,
}

/// The format we'd prefer to process instead of [`ChildResponse`].
#[derive(Debug)]
pub(super) struct RefinedChildResponse<'a> {
    status: RefinedStatus<'a>,
    timings: Timings,
}

#[derive(Debug)]
enum RefinedStatus<'a> {
    Ok(Vec<CallResultValue>),
    Error(ErrorKind),
    Failed(std::borrow::Cow<'a, str>),
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use lantern_common::macro_prelude::*;

    use super::*;

    fn messages(line: &str) -> (Status, Result<Vec<CallResultValue>, EngineFailure>) {
        let (_, status, result) = serde_json::from_str::<ChildResponse<'_>>(line)
            .unwrap()
            .refine()
            .ok()
            .unwrap()
            .into_messages();
        (status, result)
    }

    #[test]
    fn ok() {
        let (status, result) =
            messages(r#"{"status":"ok","output":["0x45"],"timings":{"execution":0.1}}"#);
        assert_eq!(status, Status::Ok);
        assert_eq!(result.unwrap(), vec![call_result_value!("0x45")]);
    }

    #[test]
    fn trap() {
        let (status, result) = messages(
            r#"{"status":"failed","exception":"Error at pc=0:118:\nAn ASSERT_EQ instruction failed: 10:0 != 10:1."}"#,
        );
        assert_eq!(status, Status::Failed);
        assert_matches!(result, Err(EngineFailure::Trap(message)) => {
            assert_eq!(message, "Error at pc=0:118:\nAn ASSERT_EQ instruction failed: 10:0 != 10:1.")
        });
    }

    #[rstest::rstest]
    #[case::no_such_contract("NO_SUCH_CONTRACT")]
    #[case::invalid_entry_point("INVALID_ENTRY_POINT")]
    #[case::invalid_input("INVALID_INPUT")]
    fn known_error(#[case] kind: &str) {
        let line = format!(r#"{{"status":"error","kind":"{kind}"}}"#);
        let (status, result) = messages(&line);
        assert_eq!(status, Status::Error);
        match kind {
            "NO_SUCH_CONTRACT" => assert_matches!(result, Err(EngineFailure::NoSuchContract)),
            "INVALID_ENTRY_POINT" => assert_matches!(result, Err(EngineFailure::InvalidEntryPoint)),
            _ => assert_matches!(result, Err(EngineFailure::Internal(_))),
        }
    }

    #[rstest::rstest]
    #[case::ok_without_output(r#"{"status":"ok"}"#)]
    #[case::error_without_kind(r#"{"status":"error"}"#)]
    #[case::failed_with_kind(r#"{"status":"failed","kind":"NO_SUCH_CONTRACT","exception":"x"}"#)]
    fn inconsistent(#[case] line: &str) {
        let response = serde_json::from_str::<ChildResponse<'_>>(line).unwrap();
        assert_matches!(response.refine(), Err(SubprocessError::InvalidResponse));
    }
}
