//! Identity scheme for senders and receivers.
//!
//! Every entry in a signal's receiver table is keyed by a [`LookupKey`]: the
//! identity of the receiver (or its dispatch uid) paired with the identity of
//! the sender it is scoped to. Identities are addresses, never values, so two
//! equal closures stored in different `Arc`s are different receivers.

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, Weak};

/// Identifier a caller can attach to a connection instead of relying on the
/// receiver's address.
pub type DispatchUid = Cow<'static, str>;

pub(crate) type Anchor = Weak<dyn Any + Send + Sync>;

// -------------------------------------------------------------------------------------------------
// Sender
// -------------------------------------------------------------------------------------------------

/// Identity of a sender as stored in the receiver table and the sender cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SenderId {
    /// The universal marker. Receivers scoped to it hear every sender.
    None,
    /// A type-level sender created with [`Sender::of`].
    Type(TypeId),
    /// An object sender created with [`Sender::instance`], keyed by address.
    Instance(usize),
}

/// Who is firing a signal.
///
/// A `Sender` never keeps the object it names alive. Instance senders hold a
/// `Weak` anchor, which also pins the allocation so its address cannot be
/// handed to another object while anything still refers to this sender.
#[derive(Clone)]
pub struct Sender {
    id: SenderId,
    name: &'static str,
    anchor: Option<Anchor>,
}

impl Sender {
    /// The anonymous sender. Receivers connected with it receive every send.
    pub fn none() -> Self {
        Self {
            id: SenderId::None,
            name: "None",
            anchor: None,
        }
    }

    /// A sender standing for the type `T` itself.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: SenderId::Type(TypeId::of::<T>()),
            name: std::any::type_name::<T>(),
            anchor: None,
        }
    }

    /// A sender standing for one particular object.
    pub fn instance<T: Any + Send + Sync>(object: &Arc<T>) -> Self {
        let erased: Arc<dyn Any + Send + Sync> = object.clone();
        Self {
            id: SenderId::Instance(Arc::as_ptr(object) as *const () as usize),
            name: std::any::type_name::<T>(),
            anchor: Some(Arc::downgrade(&erased)),
        }
    }

    /// The identity receivers are matched against.
    ///
    /// ```rust
    /// use signal_registry::{Sender, SenderId};
    ///
    /// assert_eq!(Sender::none().id(), SenderId::None);
    /// assert_eq!(Sender::of::<String>().id(), Sender::of::<String>().id());
    /// assert_ne!(Sender::of::<String>().id(), Sender::of::<u8>().id());
    /// ```
    pub fn id(&self) -> SenderId {
        self.id
    }

    /// Type name of the sender, or `"None"` for the anonymous sender.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether this is the anonymous sender from [`Sender::none`].
    pub fn is_none(&self) -> bool {
        self.id == SenderId::None
    }

    /// Whether this sender is `T`, either as a type sender or as an instance of `T`.
    pub fn is<T: 'static>(&self) -> bool {
        match self.id {
            SenderId::Type(type_id) => type_id == TypeId::of::<T>(),
            SenderId::Instance(_) => self
                .anchor
                .as_ref()
                .and_then(Weak::upgrade)
                .is_some_and(|object| object.is::<T>()),
            SenderId::None => false,
        }
    }

    /// Recovers the sending object if this is a live instance sender of type `T`.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.anchor
            .as_ref()?
            .upgrade()?
            .downcast::<T>()
            .ok()
    }

    /// `false` once an instance sender's object has been dropped.
    /// Type senders and the anonymous sender are always alive.
    pub fn is_alive(&self) -> bool {
        self.anchor
            .as_ref()
            .map_or(true, |anchor| anchor.strong_count() > 0)
    }

    pub(crate) fn anchor(&self) -> Option<&Anchor> {
        self.anchor.as_ref()
    }
}

impl Default for Sender {
    fn default() -> Self {
        Self::none()
    }
}

impl PartialEq for Sender {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Sender {}

impl fmt::Debug for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sender")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            SenderId::None => write!(f, "None"),
            SenderId::Type(_) => write!(f, "{}", self.name),
            SenderId::Instance(addr) => write!(f, "{}@{:#x}", self.name, addr),
        }
    }
}

impl<T: Any + Send + Sync> From<&Arc<T>> for Sender {
    fn from(object: &Arc<T>) -> Self {
        Sender::instance(object)
    }
}

// -------------------------------------------------------------------------------------------------
// Receiver keys
// -------------------------------------------------------------------------------------------------

/// Identity of a connected receiver.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReceiverKey {
    /// Explicit dispatch uid supplied at connect time.
    Uid(DispatchUid),
    /// A callable object or function pointer, keyed by address.
    Callable(usize),
    /// A method bound to an owner: `(owner address, function address)`.
    Method(usize, usize),
}

impl ReceiverKey {
    pub fn of_arc<T: ?Sized>(receiver: &Arc<T>) -> Self {
        ReceiverKey::Callable(Arc::as_ptr(receiver) as *const () as usize)
    }

    pub fn of_method<T>(owner: &Arc<T>, function: usize) -> Self {
        ReceiverKey::Method(Arc::as_ptr(owner) as *const () as usize, function)
    }
}

impl fmt::Display for ReceiverKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReceiverKey::Uid(uid) => write!(f, "uid:{uid}"),
            ReceiverKey::Callable(addr) => write!(f, "callable@{addr:#x}"),
            ReceiverKey::Method(owner, function) => {
                write!(f, "method@{owner:#x}::{function:#x}")
            }
        }
    }
}

/// Key of one receiver table entry. At most one entry exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct LookupKey {
    pub(crate) receiver: ReceiverKey,
    pub(crate) sender: SenderId,
}

impl LookupKey {
    /// A dispatch uid, when given, replaces the receiver's own identity.
    pub(crate) fn new(receiver: ReceiverKey, uid: Option<&DispatchUid>, sender: &Sender) -> Self {
        let receiver = match uid {
            Some(uid) => ReceiverKey::Uid(uid.clone()),
            None => receiver,
        };
        Self {
            receiver,
            sender: sender.id(),
        }
    }

    /// Whether this entry should hear a send from `sender`.
    pub(crate) fn matches(&self, sender: SenderId) -> bool {
        self.sender == SenderId::None || self.sender == sender
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Model;

    #[test]
    fn test_sender_identity_kinds() {
        let object = Arc::new(5u32);

        assert_eq!(Sender::none().id(), SenderId::None);
        assert_eq!(Sender::of::<Model>(), Sender::of::<Model>());
        assert_ne!(Sender::of::<Model>(), Sender::of::<u32>());
        assert_eq!(Sender::instance(&object), Sender::from(&object));
        assert_ne!(Sender::instance(&object), Sender::instance(&Arc::new(5u32)));
    }

    #[test]
    fn test_instance_sender_does_not_keep_object_alive() {
        let object = Arc::new(String::from("sender"));
        let sender = Sender::instance(&object);

        assert!(sender.is_alive());
        assert_eq!(sender.downcast::<String>().as_deref().map(String::as_str), Some("sender"));
        assert!(sender.is::<String>());

        drop(object);
        assert!(!sender.is_alive());
        assert!(sender.downcast::<String>().is_none());
    }

    #[test]
    fn test_type_sender_is_checks() {
        let sender = Sender::of::<Model>();
        assert!(sender.is::<Model>());
        assert!(!sender.is::<u8>());
        assert!(sender.downcast::<u8>().is_none());
        assert!(!Sender::none().is::<Model>());
    }

    #[test]
    fn test_sender_display() {
        assert_eq!(Sender::none().to_string(), "None");
        assert_eq!(Sender::of::<u8>().to_string(), "u8");
        assert!(Sender::instance(&Arc::new(1i32)).to_string().starts_with("i32@0x"));
    }

    #[test]
    fn test_uid_replaces_receiver_identity() {
        let a = Arc::new(1u8);
        let b = Arc::new(2u8);
        let uid: DispatchUid = "audit".into();

        let key_a = LookupKey::new(ReceiverKey::of_arc(&a), Some(&uid), &Sender::none());
        let key_b = LookupKey::new(ReceiverKey::of_arc(&b), Some(&uid), &Sender::none());
        assert_eq!(key_a, key_b);

        let plain_a = LookupKey::new(ReceiverKey::of_arc(&a), None, &Sender::none());
        let plain_b = LookupKey::new(ReceiverKey::of_arc(&b), None, &Sender::none());
        assert_ne!(plain_a, plain_b);
    }

    #[test]
    fn test_key_matching() {
        let object = Arc::new(0u8);
        let scoped = LookupKey::new(ReceiverKey::Callable(1), None, &Sender::instance(&object));
        let universal = LookupKey::new(ReceiverKey::Callable(1), None, &Sender::none());

        assert!(scoped.matches(Sender::instance(&object).id()));
        assert!(!scoped.matches(SenderId::None));
        assert!(!scoped.matches(Sender::of::<u8>().id()));
        assert!(universal.matches(Sender::of::<u8>().id()));
        assert!(universal.matches(SenderId::None));
    }

    #[test]
    fn test_method_key_distinguishes_functions_and_owners() {
        let owner = Arc::new(());
        let other = Arc::new(());
        assert_eq!(ReceiverKey::of_method(&owner, 10), ReceiverKey::of_method(&owner, 10));
        assert_ne!(ReceiverKey::of_method(&owner, 10), ReceiverKey::of_method(&owner, 11));
        assert_ne!(ReceiverKey::of_method(&owner, 10), ReceiverKey::of_method(&other, 10));
    }
}
