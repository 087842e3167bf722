//! Parameter values, type tags, and parameter sets.

use strum::{Display, EnumString};

/// The type a parameter is bound as.
///
/// Parsed from caller-supplied tags (`"integer"`, `"large_object"`, ...).
/// Tags outside this set are not an error: the binder falls back to
/// [`Value::infer_type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ParamType {
    /// SQL NULL.
    Null,
    /// Integer.
    Integer,
    /// Boolean.
    Boolean,
    /// Character data.
    String,
    /// Large object (binary data).
    LargeObject,
    /// Cursor / record set. Backends without cursors bind by inference.
    Cursor,
}

/// A single, non-list parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scalar {
    /// SQL NULL.
    Null,
    /// 64-bit signed integer.
    Integer(i64),
    /// Boolean.
    Boolean(bool),
    /// UTF-8 text.
    Text(String),
}

impl Scalar {
    /// Infers the binding type from the value itself.
    pub const fn infer_type(&self) -> ParamType {
        match self {
            Self::Null => ParamType::Null,
            Self::Integer(_) => ParamType::Integer,
            Self::Boolean(_) => ParamType::Boolean,
            Self::Text(_) => ParamType::String,
        }
    }
}

/// A parameter value: a scalar or a list of scalars for `IN (...)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// 64-bit signed integer.
    Integer(i64),
    /// Boolean.
    Boolean(bool),
    /// UTF-8 text.
    Text(String),
    /// List of scalars, expanded to a comma-joined sequence.
    List(Vec<Scalar>),
}

impl Value {
    /// Infers the binding type from the value itself. Lists infer as strings;
    /// their members are inferred one by one when bound.
    pub const fn infer_type(&self) -> ParamType {
        match self {
            Self::Null => ParamType::Null,
            Self::Integer(_) => ParamType::Integer,
            Self::Boolean(_) => ParamType::Boolean,
            Self::Text(_) | Self::List(_) => ParamType::String,
        }
    }

    /// Returns `true` for [`Value::Null`].
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Converts a non-list value into a [`Scalar`].
    pub fn into_scalar(self) -> Option<Scalar> {
        match self {
            Self::Null => Some(Scalar::Null),
            Self::Integer(v) => Some(Scalar::Integer(v)),
            Self::Boolean(v) => Some(Scalar::Boolean(v)),
            Self::Text(v) => Some(Scalar::Text(v)),
            Self::List(_) => None,
        }
    }
}

impl From<Scalar> for Value {
    fn from(v: Scalar) -> Self {
        match v {
            Scalar::Null => Self::Null,
            Scalar::Integer(v) => Self::Integer(v),
            Scalar::Boolean(v) => Self::Boolean(v),
            Scalar::Text(v) => Self::Text(v),
        }
    }
}

macro_rules! impl_from_primitive {
    ($($target:ident),*) => {$(
        impl From<i64> for $target {
            fn from(v: i64) -> Self {
                Self::Integer(v)
            }
        }

        impl From<i32> for $target {
            fn from(v: i32) -> Self {
                Self::Integer(i64::from(v))
            }
        }

        impl From<bool> for $target {
            fn from(v: bool) -> Self {
                Self::Boolean(v)
            }
        }

        impl From<String> for $target {
            fn from(v: String) -> Self {
                Self::Text(v)
            }
        }

        impl From<&str> for $target {
            fn from(v: &str) -> Self {
                Self::Text(v.to_string())
            }
        }

        impl<T: Into<$target>> From<Option<T>> for $target {
            fn from(v: Option<T>) -> Self {
                v.map_or(Self::Null, Into::into)
            }
        }
    )*};
}

impl_from_primitive!(Scalar, Value);

impl<T: Into<Scalar>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

/// A value together with the type tag the caller asked for, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// The value to bind.
    pub value: Value,
    /// Caller-supplied type tag. Honored only when it names a [`ParamType`].
    pub type_tag: Option<String>,
}

impl Param {
    /// The explicit tag when it is recognized, inference otherwise.
    pub fn resolved_type(&self) -> ParamType {
        self.type_tag
            .as_deref()
            .and_then(|tag| tag.parse::<ParamType>().ok())
            .unwrap_or_else(|| self.value.infer_type())
    }

    /// The explicit tag when it is recognized.
    pub fn explicit_type(&self) -> Option<ParamType> {
        self.type_tag.as_deref().and_then(|tag| tag.parse().ok())
    }
}

/// Ordered mapping from placeholder key to value.
///
/// Keys are matched literally against the statement text (`:id`, `@id`,
/// `?1`, or a bare identifier). Inserting an existing key replaces its value
/// in place, so each key is bound at most once. Keys that do not occur in a
/// statement are ignored when it is bound.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    entries: Vec<(String, Param)>,
}

impl ParameterSet {
    /// Creates an empty parameter set.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Adds (or replaces) `key` with an untagged value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.insert_param(
            key.into(),
            Param {
                value: value.into(),
                type_tag: None,
            },
        )
    }

    /// Adds (or replaces) `key` with a value and an explicit type tag.
    pub fn insert_typed(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
        type_tag: impl Into<String>,
    ) -> &mut Self {
        self.insert_param(
            key.into(),
            Param {
                value: value.into(),
                type_tag: Some(type_tag.into()),
            },
        )
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Builder form of [`insert_typed`](Self::insert_typed).
    #[must_use]
    pub fn with_typed(
        mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
        type_tag: impl Into<String>,
    ) -> Self {
        self.insert_typed(key, value, type_tag);
        self
    }

    fn insert_param(&mut self, key: String, param: Param) -> &mut Self {
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = param,
            None => self.entries.push((key, param)),
        }
        self
    }

    /// Looks up the parameter bound to `key`.
    pub fn get(&self, key: &str) -> Option<&Param> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, param)| param)
    }

    /// Iterates over `(key, param)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Param)> {
        self.entries.iter().map(|(key, param)| (key.as_str(), param))
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the set holds no parameters.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (key, value) in iter {
            set.insert(key, value);
        }
        set
    }
}

/// Convenience macro for building a [`ParameterSet`].
///
/// Usage: `params! { ":id" => 7, ":name" => "alice", ":deleted" => None::<i64> }`
#[macro_export]
macro_rules! params {
    () => {
        $crate::ParameterSet::new()
    };
    ($($key:expr => $val:expr),+ $(,)?) => {{
        let mut set = $crate::ParameterSet::new();
        $(set.insert($key, $crate::Value::from($val));)+
        set
    }};
}
