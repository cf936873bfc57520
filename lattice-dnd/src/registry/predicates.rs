//! Predicate Registry
//!
//! The drag engine asks a handful of yes/no questions on every pointer move:
//! may this item be dragged, may it land here, should it be copied. Each
//! question has exactly one answer source, a *slot*, holding either a custom
//! predicate or falling through to the built-in default policy.
//!
//! # Slot Policy
//!
//! Slots are exclusive. The rules for who occupies a slot are explicit:
//!
//! 1. `add_*` installs only into a vacant slot. The first container to
//!    configure a slot keeps it; later attempts are reported back as
//!    [`SlotRegistration::Ignored`] and logged.
//! 2. `replace_*` installs unconditionally, displacing the current holder.
//! 3. `release_owner` vacates every slot an owner installed, so the next
//!    container to mount can claim it.
//!
//! # Defaults
//!
//! - **accepts**: both containers declare the same non-empty group name.
//! - **copy**: the source container is in copy mode.
//! - **moves**: always. **invalid**: never. **is_container**: never.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use super::OwnerId;
use crate::dom::{Container, ItemNode};

/// Decides whether `el` may be dropped into `target` coming from `source`,
/// in front of `sibling`.
pub type AcceptsPredicate =
    dyn Fn(&ItemNode, &Container, &Container, Option<&ItemNode>) -> bool + Send + Sync;

/// Decides whether `el` may be dragged out of `source` when grabbed by
/// `handle`.
pub type MovesPredicate =
    dyn Fn(&ItemNode, &Container, &ItemNode, Option<&ItemNode>) -> bool + Send + Sync;

/// Decides whether grabbing `el` through `handle` must be ignored.
pub type InvalidPredicate = dyn Fn(&ItemNode, &ItemNode) -> bool + Send + Sync;

/// Decides whether dragging `el` out of `source` copies it.
pub type CopyPredicate = dyn Fn(&ItemNode, &Container) -> bool + Send + Sync;

/// Decides whether an unregistered element acts as a container.
pub type IsContainerPredicate = dyn Fn(&Container) -> bool + Send + Sync;

/// The predicate slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredicateKind {
    Accepts,
    Moves,
    Invalid,
    Copy,
    IsContainer,
}

impl PredicateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepts => "accepts",
            Self::Moves => "moves",
            Self::Invalid => "invalid",
            Self::Copy => "copy",
            Self::IsContainer => "isContainer",
        }
    }
}

/// Outcome of a first-writer-wins registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRegistration {
    /// The slot was vacant and now holds the new predicate.
    Installed,
    /// The slot was already taken; the new predicate was not installed.
    Ignored,
}

struct Installed<F: ?Sized> {
    owner: Option<OwnerId>,
    predicate: Arc<F>,
}

/// A single exclusive predicate slot.
struct Slot<F: ?Sized> {
    kind: PredicateKind,
    entry: RwLock<Option<Installed<F>>>,
}

impl<F: ?Sized> Slot<F> {
    fn new(kind: PredicateKind) -> Self {
        Self {
            kind,
            entry: RwLock::new(None),
        }
    }

    fn add(&self, owner: Option<OwnerId>, predicate: Arc<F>) -> SlotRegistration {
        let mut entry = self.entry.write();
        if let Some(current) = entry.as_ref() {
            warn!(
                slot = self.kind.as_str(),
                holder = ?current.owner,
                rejected = ?owner,
                "predicate slot already taken, registration ignored"
            );
            return SlotRegistration::Ignored;
        }

        debug!(slot = self.kind.as_str(), ?owner, "predicate installed");
        *entry = Some(Installed { owner, predicate });
        SlotRegistration::Installed
    }

    fn replace(&self, owner: Option<OwnerId>, predicate: Arc<F>) -> bool {
        debug!(slot = self.kind.as_str(), ?owner, "predicate replaced");
        self.entry
            .write()
            .replace(Installed { owner, predicate })
            .is_some()
    }

    fn release(&self, owner: OwnerId) -> bool {
        let mut entry = self.entry.write();
        match entry.as_ref() {
            Some(current) if current.owner == Some(owner) => {
                debug!(slot = self.kind.as_str(), ?owner, "predicate slot released");
                *entry = None;
                true
            }
            _ => false,
        }
    }

    fn clear(&self) {
        *self.entry.write() = None;
    }

    /// Clone the predicate out so it runs without the lock held.
    fn get(&self) -> Option<Arc<F>> {
        self.entry
            .read()
            .as_ref()
            .map(|installed| Arc::clone(&installed.predicate))
    }

    fn is_custom(&self) -> bool {
        self.entry.read().is_some()
    }
}

/// Default accepts policy: both groups set and equal.
pub fn default_accepts(target: &Container, source: &Container) -> bool {
    match (target.group(), source.group()) {
        (Some(target), Some(source)) => target == source,
        _ => false,
    }
}

/// Default copy policy: the source declares copy mode.
pub fn default_copy(source: &Container) -> bool {
    source.is_copy()
}

/// The exclusive decision functions consulted by the drag engine.
pub struct PredicateRegistry {
    accepts: Slot<AcceptsPredicate>,
    moves: Slot<MovesPredicate>,
    invalid: Slot<InvalidPredicate>,
    copy: Slot<CopyPredicate>,
    is_container: Slot<IsContainerPredicate>,
}

impl PredicateRegistry {
    /// Create a registry where every slot falls through to the default.
    pub fn new() -> Self {
        Self {
            accepts: Slot::new(PredicateKind::Accepts),
            moves: Slot::new(PredicateKind::Moves),
            invalid: Slot::new(PredicateKind::Invalid),
            copy: Slot::new(PredicateKind::Copy),
            is_container: Slot::new(PredicateKind::IsContainer),
        }
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    pub fn add_accepts<F>(&self, owner: Option<OwnerId>, predicate: F) -> SlotRegistration
    where
        F: Fn(&ItemNode, &Container, &Container, Option<&ItemNode>) -> bool + Send + Sync + 'static,
    {
        self.accepts.add(owner, Arc::new(predicate))
    }

    pub fn add_moves<F>(&self, owner: Option<OwnerId>, predicate: F) -> SlotRegistration
    where
        F: Fn(&ItemNode, &Container, &ItemNode, Option<&ItemNode>) -> bool + Send + Sync + 'static,
    {
        self.moves.add(owner, Arc::new(predicate))
    }

    pub fn add_invalid<F>(&self, owner: Option<OwnerId>, predicate: F) -> SlotRegistration
    where
        F: Fn(&ItemNode, &ItemNode) -> bool + Send + Sync + 'static,
    {
        self.invalid.add(owner, Arc::new(predicate))
    }

    pub fn add_copy<F>(&self, owner: Option<OwnerId>, predicate: F) -> SlotRegistration
    where
        F: Fn(&ItemNode, &Container) -> bool + Send + Sync + 'static,
    {
        self.copy.add(owner, Arc::new(predicate))
    }

    pub fn add_is_container<F>(&self, owner: Option<OwnerId>, predicate: F) -> SlotRegistration
    where
        F: Fn(&Container) -> bool + Send + Sync + 'static,
    {
        self.is_container.add(owner, Arc::new(predicate))
    }

    /// Install an accepts predicate, displacing any current one.
    ///
    /// Returns true if a previous predicate was displaced.
    pub fn replace_accepts<F>(&self, owner: Option<OwnerId>, predicate: F) -> bool
    where
        F: Fn(&ItemNode, &Container, &Container, Option<&ItemNode>) -> bool + Send + Sync + 'static,
    {
        self.accepts.replace(owner, Arc::new(predicate))
    }

    pub fn replace_moves<F>(&self, owner: Option<OwnerId>, predicate: F) -> bool
    where
        F: Fn(&ItemNode, &Container, &ItemNode, Option<&ItemNode>) -> bool + Send + Sync + 'static,
    {
        self.moves.replace(owner, Arc::new(predicate))
    }

    pub fn replace_invalid<F>(&self, owner: Option<OwnerId>, predicate: F) -> bool
    where
        F: Fn(&ItemNode, &ItemNode) -> bool + Send + Sync + 'static,
    {
        self.invalid.replace(owner, Arc::new(predicate))
    }

    pub fn replace_copy<F>(&self, owner: Option<OwnerId>, predicate: F) -> bool
    where
        F: Fn(&ItemNode, &Container) -> bool + Send + Sync + 'static,
    {
        self.copy.replace(owner, Arc::new(predicate))
    }

    pub fn replace_is_container<F>(&self, owner: Option<OwnerId>, predicate: F) -> bool
    where
        F: Fn(&Container) -> bool + Send + Sync + 'static,
    {
        self.is_container.replace(owner, Arc::new(predicate))
    }

    /// Vacate every slot installed by `owner`.
    ///
    /// Returns the number of slots released.
    pub fn release_owner(&self, owner: OwnerId) -> usize {
        [
            self.accepts.release(owner),
            self.moves.release(owner),
            self.invalid.release(owner),
            self.copy.release(owner),
            self.is_container.release(owner),
        ]
        .into_iter()
        .filter(|released| *released)
        .count()
    }

    /// Reset one slot back to the default policy.
    pub fn reset(&self, kind: PredicateKind) {
        match kind {
            PredicateKind::Accepts => self.accepts.clear(),
            PredicateKind::Moves => self.moves.clear(),
            PredicateKind::Invalid => self.invalid.clear(),
            PredicateKind::Copy => self.copy.clear(),
            PredicateKind::IsContainer => self.is_container.clear(),
        }
    }

    /// Whether a custom predicate occupies the slot.
    pub fn is_custom(&self, kind: PredicateKind) -> bool {
        match kind {
            PredicateKind::Accepts => self.accepts.is_custom(),
            PredicateKind::Moves => self.moves.is_custom(),
            PredicateKind::Invalid => self.invalid.is_custom(),
            PredicateKind::Copy => self.copy.is_custom(),
            PredicateKind::IsContainer => self.is_container.is_custom(),
        }
    }

    // ------------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------------

    pub fn accepts(
        &self,
        el: &ItemNode,
        target: &Container,
        source: &Container,
        sibling: Option<&ItemNode>,
    ) -> bool {
        match self.accepts.get() {
            Some(predicate) => predicate(el, target, source, sibling),
            None => default_accepts(target, source),
        }
    }

    pub fn moves(
        &self,
        el: &ItemNode,
        source: &Container,
        handle: &ItemNode,
        sibling: Option<&ItemNode>,
    ) -> bool {
        match self.moves.get() {
            Some(predicate) => predicate(el, source, handle, sibling),
            None => true,
        }
    }

    pub fn invalid(&self, el: &ItemNode, handle: &ItemNode) -> bool {
        match self.invalid.get() {
            Some(predicate) => predicate(el, handle),
            None => false,
        }
    }

    pub fn copy(&self, el: &ItemNode, source: &Container) -> bool {
        match self.copy.get() {
            Some(predicate) => predicate(el, source),
            None => default_copy(source),
        }
    }

    pub fn is_container(&self, element: &Container) -> bool {
        match self.is_container.get() {
            Some(predicate) => predicate(element),
            None => false,
        }
    }
}

impl Default for PredicateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PredicateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredicateRegistry")
            .field("accepts", &self.accepts.is_custom())
            .field("moves", &self.moves.is_custom())
            .field("invalid", &self.invalid.is_custom())
            .field("copy", &self.copy.is_custom())
            .field("is_container", &self.is_container.is_custom())
            .finish()
    }
}
