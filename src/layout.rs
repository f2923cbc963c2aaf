//! Argument layout: arity plus the order in which arguments become keys.
//!
//! A layout with arity 3 and key order `[1, 0, 2]` nests the tree on the
//! second argument, then the first, then the third. Positions may repeat
//! (each repeat adds a level keyed on the same argument) or be left out (the
//! argument is passed to the getter but never distinguishes entries).

use std::borrow::Cow;

use crate::error::{ConfigError, KeyError};
use crate::key::{Arg, KeySlot};

/// Immutable description of how call arguments map onto tree levels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLayout {
    arity: usize,
    key_order: Vec<usize>,
}

impl KeyLayout {
    /// Identity layout: every argument is keyed, in call order.
    pub fn identity(arity: usize) -> Self {
        Self {
            arity,
            key_order: (0..arity).collect(),
        }
    }

    /// Layout with an explicit 0-based key order.
    ///
    /// Fails if any position is `>= arity`.
    pub fn with_key_order(arity: usize, key_order: Vec<usize>) -> Result<Self, ConfigError> {
        if let Some(&position) = key_order.iter().find(|&&p| p >= arity) {
            return Err(ConfigError::KeyPositionOutOfRange { position, arity });
        }
        Ok(Self { arity, key_order })
    }

    /// Number of positional arguments the getter takes.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Argument positions used as keys, outermost level first.
    pub fn key_order(&self) -> &[usize] {
        &self.key_order
    }

    /// Number of tree levels.
    pub fn depth(&self) -> usize {
        self.key_order.len()
    }

    /// Pads missing trailing arguments with [`Arg::Nil`].
    pub(crate) fn normalize<'a>(&self, args: &'a [Arg]) -> Result<Cow<'a, [Arg]>, KeyError> {
        match args.len() {
            n if n == self.arity => Ok(Cow::Borrowed(args)),
            n if n > self.arity => Err(KeyError::TooManyArguments {
                arity: self.arity,
                got: n,
            }),
            _ => {
                let mut padded = args.to_vec();
                padded.resize(self.arity, Arg::Nil);
                Ok(Cow::Owned(padded))
            },
        }
    }

    /// Extracts the key path from a normalized argument list.
    pub(crate) fn key_path(&self, args: &[Arg]) -> Result<Vec<KeySlot>, KeyError> {
        debug_assert_eq!(args.len(), self.arity);
        self.key_order
            .iter()
            .map(|&position| KeySlot::from_arg(&args[position], position))
            .collect()
    }

    /// Converts an invalidation prefix, already given in key order.
    pub(crate) fn prefix_path(&self, prefix: &[Arg]) -> Result<Vec<KeySlot>, KeyError> {
        if prefix.len() > self.depth() {
            return Err(KeyError::PrefixTooLong {
                depth: self.depth(),
                got: prefix.len(),
            });
        }
        prefix
            .iter()
            .zip(&self.key_order)
            .map(|(arg, &position)| KeySlot::from_arg(arg, position))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_keys_every_argument() {
        let layout = KeyLayout::identity(3);
        assert_eq!(layout.key_order(), &[0, 1, 2]);
        assert_eq!(layout.depth(), 3);
    }

    #[test]
    fn out_of_range_position_fails_fast() {
        let err = KeyLayout::with_key_order(2, vec![0, 1, 2]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::KeyPositionOutOfRange {
                position: 2,
                arity: 2
            }
        );
    }

    #[test]
    fn duplicates_and_omissions_are_accepted() {
        let dup = KeyLayout::with_key_order(2, vec![0, 0]).unwrap();
        assert_eq!(dup.depth(), 2);
        let partial = KeyLayout::with_key_order(3, vec![2]).unwrap();
        assert_eq!(partial.depth(), 1);
    }

    #[test]
    fn normalize_pads_with_nil() {
        let layout = KeyLayout::identity(3);
        let args = crate::args![1];
        let normalized = layout.normalize(&args).unwrap();
        assert_eq!(&*normalized, &[Arg::Int(1), Arg::Nil, Arg::Nil]);
    }

    #[test]
    fn normalize_borrows_exact_arity() {
        let layout = KeyLayout::identity(2);
        let args = crate::args![1, 2];
        assert!(matches!(layout.normalize(&args).unwrap(), Cow::Borrowed(_)));
    }

    #[test]
    fn normalize_rejects_extra_arguments() {
        let layout = KeyLayout::identity(1);
        let args = crate::args![1, 2];
        assert_eq!(
            layout.normalize(&args).unwrap_err(),
            KeyError::TooManyArguments { arity: 1, got: 2 }
        );
    }

    #[test]
    fn key_path_follows_key_order() {
        let layout = KeyLayout::with_key_order(3, vec![1, 0, 2]).unwrap();
        let path = layout.key_path(&crate::args!["a", "b", "c"]).unwrap();
        let expected: Vec<KeySlot> = ["b", "a", "c"]
            .iter()
            .map(|s| KeySlot::from_arg(&Arg::from(*s), 0).unwrap())
            .collect();
        assert_eq!(path, expected);
    }

    #[test]
    fn nan_reports_argument_position() {
        let layout = KeyLayout::with_key_order(2, vec![1, 0]).unwrap();
        let err = layout.key_path(&crate::args![1, f64::NAN]).unwrap_err();
        assert_eq!(err, KeyError::NanKey { position: 1 });
    }

    #[test]
    fn prefix_longer_than_depth_is_rejected() {
        let layout = KeyLayout::with_key_order(3, vec![0]).unwrap();
        assert_eq!(
            layout.prefix_path(&crate::args![1, 2]).unwrap_err(),
            KeyError::PrefixTooLong { depth: 1, got: 2 }
        );
        assert!(layout.prefix_path(&[]).unwrap().is_empty());
    }
}
