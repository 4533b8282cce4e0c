//! A controller's registers and ports, and the name-based resolution the
//! CPU uses to read and write them.

use std::collections::HashMap;

use mcx4_core::{ControllerId, Interface, PortError, PortKind, Register};

use crate::error::{McxError, RunError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PortKey(PortKind, u32);

/// Splits a lowercased token into a port-type letter and its index digits,
/// or returns `None` if the token isn't shaped like a port name at all
/// (e.g. it doesn't start with a letter, or has no trailing digits).
fn port_name_shape(name: &str) -> Option<(char, &str)> {
    let mut chars = name.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    let rest = &name[first.len_utf8()..];
    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((first, rest))
}

/// The registers and ports belonging to one controller.
///
/// Ports are instantiated lazily on first access, up to the highest index
/// configured for that port type; registers are all created up front.
#[derive(Debug)]
pub struct ControllerIo {
    id: ControllerId,
    name: String,
    registers: HashMap<String, Register>,
    ports: HashMap<PortKey, Interface>,
    /// Highest legal port index, or negative if no port of that type exists
    /// at all (reachable by explicitly configuring zero ports).
    gpio_max: i64,
    xbus_max: i64,
    attached_to_board: bool,
    pending_sleep: Option<i64>,
}

impl ControllerIo {
    pub(crate) fn new(id: ControllerId, name: String, gpio_max: i64, xbus_max: i64, dats: u32) -> Self {
        let mut registers = HashMap::new();
        registers.insert("acc".to_string(), Register::new());
        registers.insert("null".to_string(), Register::null());
        for n in 0..dats {
            registers.insert(format!("dat{n}"), Register::new());
        }
        Self {
            id,
            name,
            registers,
            ports: HashMap::new(),
            gpio_max,
            xbus_max,
            attached_to_board: false,
            pending_sleep: None,
        }
    }

    pub(crate) fn id(&self) -> ControllerId {
        self.id
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Resolves `dat` (with no register of that exact name) to `dat0`.
    fn register_key(&self, name: &str) -> Option<String> {
        if self.registers.contains_key(name) {
            Some(name.to_string())
        } else if name == "dat" && self.registers.contains_key("dat0") {
            Some("dat0".to_string())
        } else {
            None
        }
    }

    /// Reads a register's current value by name.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Register`] if no register by that name exists.
    pub fn register(&self, name: &str) -> Result<i64, PortError> {
        let name = name.to_lowercase();
        self.register_key(&name)
            .and_then(|key| self.registers.get(&key))
            .map(Register::read)
            .ok_or_else(|| PortError::Register(name.clone()))
    }

    /// Returns the port named e.g. `"p0"` or `"x2"`, instantiating it if this
    /// is the first access.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Port`] if the name doesn't have a recognized
    /// port-type prefix, or if its index is beyond the configured range.
    pub fn port(&mut self, name: &str) -> Result<Interface, PortError> {
        let name = name.to_lowercase();
        let (ptype, digits) = port_name_shape(&name)
            .ok_or_else(|| PortError::Port(format!("invalid port name: {name}")))?;
        self.get_port(ptype, digits)
    }

    fn get_port(&mut self, ptype: char, digits: &str) -> Result<Interface, PortError> {
        let kind = match ptype {
            'p' => PortKind::Gpio,
            'x' => PortKind::Xbus,
            _ => return Err(PortError::Port(format!("unknown port type: {ptype}"))),
        };
        let pnum: u32 = digits
            .parse()
            .map_err(|_| PortError::Port(format!("invalid port number: {digits}")))?;
        let max = match kind {
            PortKind::Gpio => self.gpio_max,
            PortKind::Xbus => self.xbus_max,
        };
        if i64::from(pnum) > max {
            return Err(PortError::Port(format!(
                "port out of supported range: {ptype}{pnum}"
            )));
        }
        let key = PortKey(kind, pnum);
        if let Some(existing) = self.ports.get(&key) {
            return Ok(existing.clone());
        }
        let iface = Interface::new(kind, self.id, format!("{}.{ptype}{pnum}", self.name));
        if self.attached_to_board {
            iface.mark_buffered();
        }
        self.ports.insert(key, iface.clone());
        Ok(iface)
    }

    /// Resolves a token to a value: a register or port reading if the name
    /// matches one, a parsed integer otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`McxError::Port`] if the token looks like a port name but
    /// doesn't resolve to a valid one, or [`McxError::Run`] if it isn't a
    /// register, a port, or a valid integer.
    pub fn value_of(&mut self, token: &str) -> Result<i64, McxError> {
        let name = token.to_lowercase();
        if let Some(key) = self.register_key(&name) {
            return Ok(self.registers[&key].read());
        }
        if let Some((ptype, digits)) = port_name_shape(&name) {
            return Ok(self.get_port(ptype, digits)?.read());
        }
        name.parse::<i64>()
            .map_err(|_| McxError::Run(RunError::Command(format!("invalid operand: {token}"))))
    }

    /// Writes a value to the register or port named by `token`.
    ///
    /// # Errors
    ///
    /// Returns [`McxError::Port`] if `token` doesn't resolve to a register
    /// or a valid port.
    pub fn write_to(&mut self, token: &str, value: i64) -> Result<(), McxError> {
        let name = token.to_lowercase();
        if let Some(key) = self.register_key(&name) {
            if let Some(reg) = self.registers.get_mut(&key) {
                reg.write(value);
            }
            return Ok(());
        }
        if let Some((ptype, digits)) = port_name_shape(&name) {
            self.get_port(ptype, digits)?.write(value);
            return Ok(());
        }
        Err(McxError::Port(PortError::Register(format!(
            "invalid register: {token}"
        ))))
    }

    pub(crate) fn request_sleep(&mut self, atus: i64) {
        self.pending_sleep = Some(atus);
    }

    pub(crate) fn take_sleep_request(&mut self) -> Option<i64> {
        self.pending_sleep.take()
    }

    /// Catches up every port's peer-visible output with what's been driven.
    pub(crate) fn commit_outputs(&self) {
        for port in self.ports.values() {
            port.commit();
        }
    }

    pub(crate) fn mark_attached_to_board(&mut self) {
        self.attached_to_board = true;
        for port in self.ports.values() {
            port.mark_buffered();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn io() -> ControllerIo {
        ControllerIo::new(ControllerId(0), "mc0".to_string(), 1, 0, 2)
    }

    #[test]
    fn acc_and_null_always_exist() {
        let io = io();
        assert_eq!(io.register("acc").unwrap(), 0);
        assert_eq!(io.register("null").unwrap(), 0);
    }

    #[test]
    fn dat_alias_tracks_dat0() {
        let mut io = io();
        io.write_to("dat0", 7).unwrap();
        assert_eq!(io.value_of("dat").unwrap(), 7);
    }

    #[test]
    fn unknown_register_name_errors() {
        let io = io();
        assert!(matches!(io.register("dat9"), Err(PortError::Register(_))));
    }

    #[test]
    fn port_out_of_range_errors() {
        let mut io = io();
        assert!(matches!(io.port("p1"), Err(PortError::Port(_))));
        assert!(io.port("p0").is_ok());
    }

    #[test]
    fn writing_null_is_a_no_op() {
        let mut io = io();
        io.write_to("null", 42).unwrap();
        assert_eq!(io.register("null").unwrap(), 0);
    }
}
