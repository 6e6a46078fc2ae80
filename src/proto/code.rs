use super::error::{ProtoError, ProtoResult};

/// Message numbers used for requests from the client to the agent.
///
/// https://datatracker.ietf.org/doc/html/draft-miller-ssh-agent#name-message-numbers
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[allow(missing_docs)]
#[repr(u8)]
pub enum RequestCode {
    RequestIdentities = 11,
    SignRequest = 13,
    Extension = 27,
}

impl RequestCode {
    /// Convert an unsigned byte into a [`RequestCode`] (if valid)
    pub fn from_u8(byte: u8) -> ProtoResult<Self> {
        let out = match byte {
            11 => Self::RequestIdentities,
            13 => Self::SignRequest,
            27 => Self::Extension,
            command => Err(ProtoError::UnsupportedCommand { command })?,
        };

        Ok(out)
    }

    /// Serialize the request code as a byte
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Message numbers used for responses from the agent to the client.
///
/// https://datatracker.ietf.org/doc/html/draft-miller-ssh-agent#name-message-numbers
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[allow(missing_docs)]
#[repr(u8)]
pub enum ResponseCode {
    Failure = 5,
    Success = 6,
    IdentitiesAnswer = 12,
    SignResponse = 14,
    ExtensionFailure = 28,
    ExtensionResponse = 29,
}

impl ResponseCode {
    /// Convert an unsigned byte into a [`ResponseCode`] (if valid)
    pub fn from_u8(byte: u8) -> ProtoResult<Self> {
        let out = match byte {
            5 => Self::Failure,
            6 => Self::Success,
            12 => Self::IdentitiesAnswer,
            14 => Self::SignResponse,
            28 => Self::ExtensionFailure,
            29 => Self::ExtensionResponse,
            command => Err(ProtoError::UnsupportedCommand { command })?,
        };
        Ok(out)
    }

    /// Serialize the response code as a byte
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(RequestCode::RequestIdentities)]
    #[case(RequestCode::SignRequest)]
    #[case(RequestCode::Extension)]
    fn request_codes_are_stable(#[case] code: RequestCode) {
        assert_eq!(RequestCode::from_u8(code.to_u8()).ok(), Some(code));
    }

    #[test]
    fn unknown_response_code_is_rejected() {
        assert!(matches!(
            ResponseCode::from_u8(13),
            Err(ProtoError::UnsupportedCommand { command: 13 })
        ));
    }
}
