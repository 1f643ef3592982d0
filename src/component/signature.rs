//! Declared component shapes.

use indexmap::{IndexMap, IndexSet};
use weft_core::{Error, Result, TypeExpr, TypeKey};

/// One argument of a component signature.
#[derive(Debug, Clone)]
pub enum Slot {
    /// `Required<...>`: keys the component consumes without providing them.
    Required(Vec<TypeExpr>),
    /// A key the component provides.
    Provided(TypeExpr),
}

impl Slot {
    pub fn required<I>(exprs: I) -> Self
    where
        I: IntoIterator<Item = TypeExpr>,
    {
        Self::Required(exprs.into_iter().collect())
    }

    pub const fn provided(expr: TypeExpr) -> Self {
        Self::Provided(expr)
    }
}

/// The declared shape of a component: the keys it requires, then the keys it provides.
///
/// A signature is validated when it is declared, before any component is built against it.
///
/// # Example
///
/// ```
/// use weft::{Signature, Slot, TypeExpr};
///
/// struct Config;
/// struct Database;
///
/// // Component<Required<Config>, Database>
/// let signature = Signature::new([
///     Slot::required([TypeExpr::of::<Config>()]),
///     Slot::provided(TypeExpr::of::<Database>()),
/// ])?;
/// assert_eq!(signature.required().count(), 1);
///
/// // Component<Database, Required<Config>>
/// let err = Signature::new([
///     Slot::provided(TypeExpr::of::<Database>()),
///     Slot::required([TypeExpr::of::<Config>()]),
/// ])
/// .unwrap_err();
/// assert!(err.is_required_in_arguments(&weft::TypeKey::of::<Config>()));
/// # Ok::<(), weft::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Signature {
    required: IndexSet<TypeKey>,
    provided: IndexMap<TypeKey, TypeExpr>,
}

impl Signature {
    /// The signature of a component that neither requires nor provides anything.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Declares a signature from its slots.
    ///
    /// # Errors
    ///
    /// - [`Error::RequiredTypesInComponentArguments`] if a [`Slot::Required`] is not the first
    ///   slot, naming the keys of the first misplaced one. This is reported before any other
    ///   error, even when the misplaced marker names a pointer.
    /// - [`Error::NonClassType`] if a slot names a pointer or a function.
    /// - [`Error::RepeatedTypes`] if a key appears twice, including a key both required and
    ///   provided.
    pub fn new<I>(slots: I) -> Result<Self>
    where
        I: IntoIterator<Item = Slot>,
    {
        let slots: Vec<_> = slots.into_iter().collect();

        // Placement is structural, checked before any key.
        if let Some(exprs) = slots.iter().skip(1).find_map(|slot| match slot {
            Slot::Required(exprs) => Some(exprs),
            Slot::Provided(_) => None,
        }) {
            // Misplacement wins over malformed types inside the marker.
            let keys: Vec<_> = exprs
                .iter()
                .filter_map(|expr| TypeKey::from_lookup(expr).ok())
                .collect();
            debug!(?keys, "misplaced required marker");
            return Err(Error::RequiredTypesInComponentArguments { keys });
        }

        let mut signature = Self::default();
        for slot in slots {
            match slot {
                Slot::Required(exprs) => {
                    for expr in &exprs {
                        let key = TypeKey::from_declaration(expr)?;
                        if !signature.required.insert(key) {
                            return Err(Error::RepeatedTypes { key });
                        }
                    }
                }
                Slot::Provided(expr) => {
                    let key = TypeKey::from_declaration(&expr)?;
                    if signature.required.contains(&key) || signature.provided.contains_key(&key)
                    {
                        return Err(Error::RepeatedTypes { key });
                    }
                    signature.provided.insert(key, expr);
                }
            }
        }

        Ok(signature)
    }

    /// Returns the required keys, in declaration order.
    pub fn required(&self) -> impl ExactSizeIterator<Item = &TypeKey> {
        self.required.iter()
    }

    /// Returns the provided keys, in declaration order.
    pub fn provided(&self) -> impl ExactSizeIterator<Item = &TypeKey> {
        self.provided.keys()
    }

    /// Returns the provided keys along with the expressions they were declared from.
    pub(crate) fn provided_exprs(&self) -> impl Iterator<Item = (&TypeKey, &TypeExpr)> {
        self.provided.iter()
    }

    #[inline]
    pub fn requires(&self, key: &TypeKey) -> bool {
        self.required.contains(key)
    }

    #[inline]
    pub fn provides(&self, key: &TypeKey) -> bool {
        self.provided.contains_key(key)
    }
}
