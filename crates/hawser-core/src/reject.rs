//! Channel rejection reasons
//!
//! SSH defines four standard reasons for refusing a channel open
//! (RFC 4254 section 5.1). Hawser extends the space from 1000 with the
//! framework-level reasons produced by the dispatcher. The numeric codes
//! and their accompanying messages are wire-observable and form part of
//! Hawser's compatibility contract.

/// Reason communicated to the peer when a channel open is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionReason {
    /// RFC 4254: administratively prohibited
    Prohibited,
    /// RFC 4254: connect failed
    ConnectFailed,
    /// RFC 4254: unknown channel type
    UnknownChannelType,
    /// RFC 4254: resource shortage
    ResourceShortage,
    /// Accepting the channel failed after routing succeeded
    ChannelAcceptError,
    /// The channel type did not parse as a request URI
    InvalidChannelType,
    /// The channel URI carried an unparseable query string
    InvalidQueryParams,
    /// The channel URI carried a host component
    HostNotSupported,
    /// The channel URI carried a scheme component
    SchemeNotSupported,
    /// The channel URI carried a user-info component
    UserNotSupported,
    /// The routed handler returned an error
    ChannelHandleError,
}

impl RejectionReason {
    /// Numeric wire code for this reason.
    pub fn code(self) -> u32 {
        match self {
            RejectionReason::Prohibited => 1,
            RejectionReason::ConnectFailed => 2,
            RejectionReason::UnknownChannelType => 3,
            RejectionReason::ResourceShortage => 4,
            RejectionReason::ChannelAcceptError => 1000,
            RejectionReason::InvalidChannelType => 1001,
            RejectionReason::InvalidQueryParams => 1002,
            RejectionReason::HostNotSupported => 1003,
            RejectionReason::SchemeNotSupported => 1004,
            RejectionReason::UserNotSupported => 1005,
            RejectionReason::ChannelHandleError => 1006,
        }
    }

    /// Reverse mapping from a wire code.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(RejectionReason::Prohibited),
            2 => Some(RejectionReason::ConnectFailed),
            3 => Some(RejectionReason::UnknownChannelType),
            4 => Some(RejectionReason::ResourceShortage),
            1000 => Some(RejectionReason::ChannelAcceptError),
            1001 => Some(RejectionReason::InvalidChannelType),
            1002 => Some(RejectionReason::InvalidQueryParams),
            1003 => Some(RejectionReason::HostNotSupported),
            1004 => Some(RejectionReason::SchemeNotSupported),
            1005 => Some(RejectionReason::UserNotSupported),
            1006 => Some(RejectionReason::ChannelHandleError),
            _ => None,
        }
    }
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RejectionReason::Prohibited => "administratively prohibited",
            RejectionReason::ConnectFailed => "connect failed",
            RejectionReason::UnknownChannelType => "unknown channel type",
            RejectionReason::ResourceShortage => "resource shortage",
            RejectionReason::ChannelAcceptError => "channel accept error",
            RejectionReason::InvalidChannelType => "invalid channel type",
            RejectionReason::InvalidQueryParams => "invalid query params",
            RejectionReason::HostNotSupported => "host not supported",
            RejectionReason::SchemeNotSupported => "scheme not supported",
            RejectionReason::UserNotSupported => "user not supported",
            RejectionReason::ChannelHandleError => "channel handle error",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framework_codes_start_at_1000() {
        assert_eq!(RejectionReason::ChannelAcceptError.code(), 1000);
        assert_eq!(RejectionReason::InvalidChannelType.code(), 1001);
        assert_eq!(RejectionReason::InvalidQueryParams.code(), 1002);
        assert_eq!(RejectionReason::HostNotSupported.code(), 1003);
        assert_eq!(RejectionReason::SchemeNotSupported.code(), 1004);
        assert_eq!(RejectionReason::UserNotSupported.code(), 1005);
        assert_eq!(RejectionReason::ChannelHandleError.code(), 1006);
    }

    #[test]
    fn test_standard_codes() {
        assert_eq!(RejectionReason::Prohibited.code(), 1);
        assert_eq!(RejectionReason::ConnectFailed.code(), 2);
        assert_eq!(RejectionReason::UnknownChannelType.code(), 3);
        assert_eq!(RejectionReason::ResourceShortage.code(), 4);
    }

    #[test]
    fn test_from_code_round_trip() {
        for code in [1u32, 2, 3, 4, 1000, 1001, 1002, 1003, 1004, 1005, 1006] {
            let reason = RejectionReason::from_code(code).unwrap();
            assert_eq!(reason.code(), code);
        }
        assert_eq!(RejectionReason::from_code(999), None);
    }
}
