use std::fmt;

// ---------------------------------------------------------------------------
// String-based identity newtypes
// ---------------------------------------------------------------------------

macro_rules! string_newtype {
    ($name:ident) => {
        #[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

// Resource name of a tuning job, e.g. `tunedModels/support-bot-v1`.
string_newtype!(JobId);
// Resource name of a base model, e.g. `models/gemini-1.5-flash-001-tuning`.
string_newtype!(ModelName);
string_newtype!(RunId);

impl ModelName {
    /// Name without the `models/` collection prefix.
    pub fn short_name(&self) -> &str {
        self.0.strip_prefix("models/").unwrap_or(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Secrets: redacted Debug and constant-time PartialEq
// ---------------------------------------------------------------------------

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let max_len = a.len().max(b.len());
    let mut result = (a.len() != b.len()) as u8;
    for i in 0..max_len {
        let x = if i < a.len() { a[i] } else { 0 };
        let y = if i < b.len() { b[i] } else { 0 };
        result |= x ^ y;
    }
    result == 0
}

macro_rules! secret_newtype {
    ($name:ident) => {
        #[derive(Clone)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                constant_time_eq(self.0.as_bytes(), other.0.as_bytes())
            }
        }

        impl Eq for $name {}

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let prefix: String = self.0.chars().take(6).collect();
                if self.0.chars().count() > 12 {
                    write!(f, "{}({prefix}...)", stringify!($name))
                } else {
                    write!(f, "{}(***)", stringify!($name))
                }
            }
        }
    };
}

secret_newtype!(ApiKey);
secret_newtype!(AccessToken);

// ---------------------------------------------------------------------------
// Credential: what a request is authenticated with
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credential {
    ApiKey(ApiKey),
    Bearer(AccessToken),
}

impl Credential {
    /// Header name and value to attach to an outgoing request.
    pub fn header(&self) -> (&'static str, String) {
        match self {
            Self::ApiKey(key) => ("x-goog-api-key", key.as_str().to_owned()),
            Self::Bearer(token) => ("authorization", format!("Bearer {}", token.as_str())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
