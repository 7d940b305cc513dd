use crate::engine::EngineError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
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
            type Err = EngineError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(EngineError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(ValueStatus {
    Normal => "normal",
    Low => "low",
    High => "high",
    CriticalLow => "critical_low",
    CriticalHigh => "critical_high",
});

str_enum!(TrendDirection {
    Improving => "improving",
    Stable => "stable",
    Worsening => "worsening",
});

str_enum!(SeverityPolicy {
    Sum => "sum",
    Max => "max",
});

str_enum!(ModelKind {
    Logistic => "logistic",
    Stump => "stump",
});

str_enum!(Sex {
    Female => "female",
    Male => "male",
});

impl ValueStatus {
    /// Ordinal tier weight used by the severity blend: normal 0, low/high 1,
    /// critical 3.
    pub fn tier_weight(&self) -> f64 {
        match self {
            Self::Normal => 0.0,
            Self::Low | Self::High => 1.0,
            Self::CriticalLow | Self::CriticalHigh => 3.0,
        }
    }

    pub fn is_normal(&self) -> bool {
        matches!(self, Self::Normal)
    }

    pub fn is_critical(&self) -> bool {
        matches!(self, Self::CriticalLow | Self::CriticalHigh)
    }
}
