//! Output-buffered ports and the shared circuits that link them together.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::error::PortError;

/// Identifies the controller that owns an [`Interface`], for self-link checks.
///
/// Controllers hand these out from an internal counter; two interfaces
/// belong to the same controller exactly when their `ControllerId`s compare
/// equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControllerId(pub u64);

/// The electrical discipline of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortKind {
    /// Clamped to `0..=100`.
    Gpio,
    /// Unclamped, arbitrary signed range.
    Xbus,
}

impl PortKind {
    const fn clamp(self, value: i64) -> i64 {
        match self {
            Self::Gpio => {
                if value > 100 {
                    100
                } else if value < 0 {
                    0
                } else {
                    value
                }
            }
            Self::Xbus => value,
        }
    }
}

#[derive(Debug)]
struct PortState {
    kind: PortKind,
    parent: ControllerId,
    name: String,
    /// The value most recently written, visible immediately via [`Interface::output`].
    driven: i64,
    /// The value peers see when they read this port. Equal to `driven` unless
    /// the owning controller has joined a board, in which case it lags by
    /// one cycle until [`Interface::commit`] runs.
    committed: i64,
    buffered: bool,
    circuit: Option<Rc<RefCell<CircuitState>>>,
}

#[derive(Debug)]
struct CircuitState {
    kind: PortKind,
    members: Vec<Weak<RefCell<PortState>>>,
}

/// A cloneable handle to a single port on a controller.
///
/// Cloning an `Interface` clones the handle, not the port: both handles
/// observe and mutate the same underlying state. A controller's port table
/// holds the single authoritative handle for each instantiated port; callers
/// that need to read or write a port go through the controller rather than
/// stashing their own clone, though nothing prevents it.
#[derive(Debug, Clone)]
pub struct Interface(Rc<RefCell<PortState>>);

impl Interface {
    /// Creates a new, unlinked interface.
    #[must_use]
    pub fn new(kind: PortKind, parent: ControllerId, name: String) -> Self {
        Self(Rc::new(RefCell::new(PortState {
            kind,
            parent,
            name,
            driven: 0,
            committed: 0,
            buffered: false,
            circuit: None,
        })))
    }

    /// The port's electrical kind.
    #[must_use]
    pub fn kind(&self) -> PortKind {
        self.0.borrow().kind
    }

    /// The qualified name, e.g. `"mc0.p0"`.
    #[must_use]
    pub fn name(&self) -> String {
        self.0.borrow().name.clone()
    }

    /// Writes a value, clamping it if this is a GPIO port.
    ///
    /// The write is visible through [`Interface::output`] immediately. It
    /// only becomes visible to peers reading through [`Interface::read`]
    /// once [`Interface::commit`] runs, which happens automatically every
    /// cycle once the owning controller joins a board; until then, reads and
    /// writes are both instantaneous.
    pub fn write(&self, value: i64) {
        let mut state = self.0.borrow_mut();
        let clamped = state.kind.clamp(value);
        state.driven = clamped;
        if !state.buffered {
            state.committed = clamped;
        }
    }

    /// The value most recently written to this port.
    #[must_use]
    pub fn output(&self) -> i64 {
        self.0.borrow().driven
    }

    /// The maximum committed output among the other interfaces on this
    /// port's circuit, or `0` if it is unlinked.
    #[must_use]
    pub fn read(&self) -> i64 {
        let circuit = self.0.borrow().circuit.clone();
        let Some(circuit) = circuit else {
            return 0;
        };
        let circuit = circuit.borrow();
        circuit
            .members
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|member| !Rc::ptr_eq(member, &self.0))
            .map(|member| member.borrow().committed)
            .max()
            .unwrap_or(0)
    }

    /// Makes this port's committed output catch up with what's been driven.
    ///
    /// Called once per cycle by a board, after every controller has had a
    /// chance to step, so that all writes issued during a cycle become
    /// visible to peers on the following cycle regardless of write order.
    pub fn commit(&self) {
        let mut state = self.0.borrow_mut();
        state.committed = state.driven;
    }

    /// Marks this port as belonging to a controller that is scheduled by a
    /// board, switching its peer-visible output from instantaneous to
    /// one-cycle-delayed.
    pub fn mark_buffered(&self) {
        self.0.borrow_mut().buffered = true;
    }

    /// Links this interface to `other`, joining (or creating) a shared circuit.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Compat`] if the two interfaces are not the same
    /// kind, or [`PortError::SelfLink`] if they belong to the same controller.
    pub fn link(&self, other: &Self) -> Result<(), PortError> {
        let circuit = other
            .0.borrow()
            .circuit
            .clone()
            .or_else(|| self.0.borrow().circuit.clone())
            .unwrap_or_else(|| {
                Rc::new(RefCell::new(CircuitState {
                    kind: self.kind(),
                    members: Vec::new(),
                }))
            });

        for candidate in [self, other] {
            Self::join(&circuit, candidate)?;
        }

        self.0.borrow_mut().circuit = Some(circuit.clone());
        other.0.borrow_mut().circuit = Some(circuit);
        Ok(())
    }

    fn join(circuit: &Rc<RefCell<CircuitState>>, port: &Self) -> Result<(), PortError> {
        let already_attached = circuit
            .borrow()
            .members
            .iter()
            .filter_map(Weak::upgrade)
            .any(|member| Rc::ptr_eq(&member, &port.0));
        if already_attached {
            return Ok(());
        }

        {
            let circuit = circuit.borrow();
            let incoming = port.0.borrow();
            for member in circuit.members.iter().filter_map(Weak::upgrade) {
                let member = member.borrow();
                if member.kind != incoming.kind {
                    return Err(PortError::Compat(format!(
                        "{:?} / {:?}",
                        member.kind, incoming.kind
                    )));
                }
                if member.parent == incoming.parent {
                    return Err(PortError::SelfLink(format!(
                        "{} via {}",
                        incoming.name, member.name
                    )));
                }
            }
        }

        circuit.borrow_mut().members.push(Rc::downgrade(&port.0));
        Ok(())
    }

    /// Removes this interface from its circuit, if any.
    pub fn unlink(&self) {
        let circuit = self.0.borrow_mut().circuit.take();
        if let Some(circuit) = circuit {
            circuit
                .borrow_mut()
                .members
                .retain(|member| member.upgrade().is_none_or(|m| !Rc::ptr_eq(&m, &self.0)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(id: u64, kind: PortKind, name: &str) -> Interface {
        Interface::new(kind, ControllerId(id), name.to_string())
    }

    #[test]
    fn unlinked_port_reads_zero() {
        let p = port(0, PortKind::Gpio, "mc0.p0");
        p.write(42);
        assert_eq!(p.output(), 42);
        assert_eq!(p.read(), 0);
    }

    #[test]
    fn gpio_write_clamps_to_0_100() {
        let p = port(0, PortKind::Gpio, "mc0.p0");
        p.write(150);
        assert_eq!(p.output(), 100);
        p.write(-10);
        assert_eq!(p.output(), 0);
    }

    #[test]
    fn xbus_write_is_unclamped() {
        let p = port(0, PortKind::Xbus, "mc0.x0");
        p.write(-5000);
        assert_eq!(p.output(), -5000);
    }

    #[test]
    fn linked_unbuffered_ports_see_writes_immediately() {
        let a = port(0, PortKind::Gpio, "mc0.p0");
        let b = port(1, PortKind::Gpio, "mc1.p0");
        a.link(&b).unwrap();
        a.write(70);
        assert_eq!(b.read(), 70);
        assert_eq!(a.read(), 0);
    }

    #[test]
    fn reads_exclude_own_output() {
        let a = port(0, PortKind::Gpio, "mc0.p0");
        let b = port(1, PortKind::Gpio, "mc1.p0");
        let c = port(2, PortKind::Gpio, "mc2.p0");
        a.link(&b).unwrap();
        b.link(&c).unwrap();
        a.write(10);
        c.write(90);
        assert_eq!(b.read(), 90);
    }

    #[test]
    fn buffered_reads_lag_one_commit() {
        let a = port(0, PortKind::Gpio, "mc0.p0");
        let b = port(1, PortKind::Gpio, "mc1.p0");
        a.link(&b).unwrap();
        a.mark_buffered();
        b.mark_buffered();
        a.write(100);
        assert_eq!(a.output(), 100);
        assert_eq!(b.read(), 0);
        a.commit();
        b.commit();
        assert_eq!(b.read(), 100);
    }

    #[test]
    fn link_rejects_mismatched_kinds() {
        let a = port(0, PortKind::Gpio, "mc0.p0");
        let b = port(1, PortKind::Xbus, "mc1.x0");
        assert!(matches!(a.link(&b), Err(PortError::Compat(_))));
    }

    #[test]
    fn link_rejects_same_controller() {
        let a = port(0, PortKind::Gpio, "mc0.p0");
        let b = port(0, PortKind::Gpio, "mc0.p1");
        assert!(matches!(a.link(&b), Err(PortError::SelfLink(_))));
    }

    #[test]
    fn unlink_drops_only_the_one_endpoint() {
        let a = port(0, PortKind::Gpio, "mc0.p0");
        let b = port(1, PortKind::Gpio, "mc1.p0");
        let c = port(2, PortKind::Gpio, "mc2.p0");
        a.link(&b).unwrap();
        b.link(&c).unwrap();
        a.write(10);
        c.write(90);

        a.unlink();
        assert_eq!(a.read(), 0);
        assert_eq!(b.read(), 90);
        assert_eq!(c.read(), 0);
    }
}
