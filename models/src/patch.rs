use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A field of a partial update.
///
/// Update payloads only carry the fields that changed, and a field sent as
/// `null` means something different from a field that was not sent at all.
/// Use together with `#[serde(default, skip_serializing_if = "Patch::is_absent")]`
/// so that a missing key becomes [`Patch::Absent`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Patch<T> {
    /// The field was not part of the update. The stored value is kept.
    Absent,
    /// The field was sent as `null`. Nullable stored values are cleared.
    Null,
    /// The field was sent with a value. The stored value is overwritten.
    Value(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Self::Absent
    }
}

impl<T> Patch<T> {
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Applies the patch to a nullable field. Returns whether the field changed.
    pub fn apply_nullable(self, target: &mut Option<T>) -> bool
    where
        T: PartialEq,
    {
        match self {
            Self::Absent => false,
            Self::Null => target.take().is_some(),
            Self::Value(v) => {
                if target.as_ref() == Some(&v) {
                    false
                } else {
                    *target = Some(v);
                    true
                }
            }
        }
    }

    /// Applies the patch to a field that can't be cleared. `Null` is ignored.
    pub fn apply(self, target: &mut T) -> bool
    where
        T: PartialEq,
    {
        match self {
            Self::Value(v) if *target != v => {
                *target = v;
                true
            }
            _ => false,
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Self::Value)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(d).map(Into::into)
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(v) => s.serialize_some(v),
            Self::Absent | Self::Null => s.serialize_none(),
        }
    }
}
