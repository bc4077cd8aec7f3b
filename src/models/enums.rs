use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

/// Requested urgency of an alert. Ordered: `Critical` is the highest tier
/// and is the only one that adds the URGENT marker to composed messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UrgencyLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl UrgencyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Highest tier — triggers the URGENT marker and callback instruction
    pub fn is_highest(&self) -> bool {
        matches!(self, Self::Critical)
    }
}

impl std::str::FromStr for UrgencyLevel {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(DatabaseError::InvalidEnum {
                field: "UrgencyLevel".into(),
                value: s.into(),
            }),
        }
    }
}

str_enum!(DeliveryStatus {
    Pending => "pending",
    Sent => "sent",
    Delivered => "delivered",
    Failed => "failed",
    Undelivered => "undelivered",
});

impl DeliveryStatus {
    /// Terminal for the synchronous send contract. `Sent` may still be
    /// refined to `Delivered`/`Undelivered` by an explicit status query.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

str_enum!(ReasonCode {
    InvalidRecipient => "invalid_recipient",
    InvalidContext => "invalid_context",
    NotConfigured => "not_configured",
    CredentialsUnavailable => "credentials_unavailable",
    AuthRejected => "auth_rejected",
    RecipientRejected => "recipient_rejected",
    RateLimited => "rate_limited",
    NetworkError => "network_error",
    Timeout => "timeout",
    ProviderUnavailable => "provider_unavailable",
    ProviderError => "provider_error",
});

str_enum!(Gender {
    Female => "female",
    Male => "male",
    Unspecified => "unspecified",
});

impl Gender {
    /// Single-letter code used in composed SMS text
    pub fn code(&self) -> &'static str {
        match self {
            Self::Female => "F",
            Self::Male => "M",
            Self::Unspecified => "?",
        }
    }
}

str_enum!(ExportFormat {
    Csv => "csv",
    Json => "json",
});
