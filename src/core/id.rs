//! UUID-backed identifiers for the records that flow through the pipeline.

/// Define a `Copy` newtype over [`uuid::Uuid`] with the usual conversions.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub uuid::Uuid);

        impl $name {
            /// Create a new unique identifier.
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Return first 8 characters of the UUID for display.
            pub fn short(&self) -> String {
                self.0.to_string()[..8].to_string()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Ok(Self(uuid::Uuid::parse_str(s)?))
            }
        }
    };
}

uuid_id!(
    /// Identifier of a submitted task.
    TaskId
);
uuid_id!(
    /// Identifier of a plan produced by the planner.
    PlanId
);
uuid_id!(
    /// Identifier of one executor run over a plan.
    ExecutionId
);
uuid_id!(
    /// Identifier of a generated report.
    ReportId
);
