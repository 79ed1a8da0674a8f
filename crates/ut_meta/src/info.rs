use alloc::rc::Rc;
use core::fmt;

use bitflags::bitflags;

bitflags! {
    /// Feature set recorded in every payload.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    pub struct Flags: u32 {
        /// Multi-byte scalars are little-endian. Big-endian otherwise.
        const LITTLE_ENDIAN       = 1 << 0;
        /// Every node carries its type name.
        const TYPE_INFO           = 1 << 1;
        /// Every node carries a link id, pointers can be serialized.
        const LINKAGE_INFO        = 1 << 2;
        /// Binary nodes carry their names.
        const BINARY_NAMES        = 1 << 3;
        /// Binary nodes carry their byte size, so they can be skipped.
        const SIZE_INFO           = 1 << 4;
        /// Text payload of a node lives in a dedicated `value` child.
        const VALUE_ENCAPSULATION = 1 << 5;
    }
}

/// Byte order of multi-byte scalars.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    /// Byte order of the target platform.
    #[cfg(target_endian = "little")]
    pub const NATIVE: Self = Self::Little;
    /// Byte order of the target platform.
    #[cfg(target_endian = "big")]
    pub const NATIVE: Self = Self::Big;
}

/// Receives every diagnostic message emitted during one call.
pub type LogHook = Rc<dyn Fn(&str)>;

/// Serialization settings: a version number and a set of [`Flags`].
///
/// Flags are kept consistent on every change:
///
/// - binary names, type info or linkage info force
///   [`VALUE_ENCAPSULATION`](Flags::VALUE_ENCAPSULATION), so that attribute
///   nodes never collide with a bare scalar value;
/// - binary names or type info force [`SIZE_INFO`](Flags::SIZE_INFO), so that
///   a detected mismatch can always be skipped.
///
/// # Examples
///
/// ```
/// use ut_meta::{Flags, Info};
///
/// let mut info = Info::pure();
/// info.enable(Flags::TYPE_INFO);
///
/// assert!(info.has_value_encapsulation());
/// assert!(info.has_size_info());
/// assert_eq!(info.version(), 1);
/// ```
#[derive(Clone)]
pub struct Info {
    version: u32,
    flags: Flags,
    log_hook: Option<LogHook>,
}

impl Info {
    /// Version written when none is set explicitly.
    pub const DEFAULT_VERSION: u32 = 1;

    /// Creates a record from raw flags, correcting them if needed.
    pub fn new(flags: Flags, version: u32) -> Self {
        Self {
            version,
            flags: Self::verify(flags),
            log_hook: None,
        }
    }

    /// Every feature enabled.
    pub fn complete() -> Self {
        Self::new(Flags::all(), Self::DEFAULT_VERSION)
    }

    /// Names and sizes only: small binary output that still tolerates
    /// added or removed fields.
    pub fn minimal() -> Self {
        Self::new(
            Flags::LITTLE_ENDIAN | Flags::BINARY_NAMES | Flags::SIZE_INFO,
            Self::DEFAULT_VERSION,
        )
    }

    /// Raw little-endian payload without any metadata.
    pub fn pure() -> Self {
        Self::new(Flags::LITTLE_ENDIAN, Self::DEFAULT_VERSION)
    }

    fn verify(mut flags: Flags) -> Flags {
        if flags.intersects(Flags::BINARY_NAMES | Flags::TYPE_INFO | Flags::LINKAGE_INFO) {
            flags.insert(Flags::VALUE_ENCAPSULATION);
        }
        if flags.intersects(Flags::BINARY_NAMES | Flags::TYPE_INFO) {
            flags.insert(Flags::SIZE_INFO);
        }
        flags
    }

    #[inline]
    pub const fn version(&self) -> u32 {
        self.version
    }

    #[inline]
    pub fn set_version(&mut self, version: u32) {
        self.version = version;
    }

    #[inline]
    pub const fn flags(&self) -> Flags {
        self.flags
    }

    /// Replaces all flags.
    pub fn set_flags(&mut self, flags: Flags) {
        self.flags = Self::verify(flags);
    }

    /// Turns `flags` on.
    pub fn enable(&mut self, flags: Flags) {
        self.set_flags(self.flags | flags);
    }

    /// Turns `flags` off. Flags implied by others stay on.
    pub fn disable(&mut self, flags: Flags) {
        self.set_flags(self.flags - flags);
    }

    #[inline]
    pub const fn has_type_info(&self) -> bool {
        self.flags.contains(Flags::TYPE_INFO)
    }

    #[inline]
    pub const fn has_linkage_info(&self) -> bool {
        self.flags.contains(Flags::LINKAGE_INFO)
    }

    #[inline]
    pub const fn has_binary_names(&self) -> bool {
        self.flags.contains(Flags::BINARY_NAMES)
    }

    #[inline]
    pub const fn has_size_info(&self) -> bool {
        self.flags.contains(Flags::SIZE_INFO)
    }

    #[inline]
    pub const fn has_value_encapsulation(&self) -> bool {
        self.flags.contains(Flags::VALUE_ENCAPSULATION)
    }

    #[inline]
    pub const fn endianness(&self) -> Endian {
        if self.flags.contains(Flags::LITTLE_ENDIAN) {
            Endian::Little
        } else {
            Endian::Big
        }
    }

    pub fn set_endianness(&mut self, endian: Endian) {
        self.flags.set(Flags::LITTLE_ENDIAN, endian == Endian::Little);
    }

    /// Installs a hook receiving every diagnostic message of a call.
    ///
    /// The hook is not serialized; a record read back from a payload keeps
    /// the hook of the snapshot it was read into.
    ///
    /// # Examples
    ///
    /// ```
    /// use core::cell::RefCell;
    /// use std::rc::Rc;
    /// use ut_meta::Info;
    ///
    /// let messages = Rc::new(RefCell::new(Vec::new()));
    /// let sink = messages.clone();
    ///
    /// let mut info = Info::complete();
    /// info.set_log_hook(move |m| sink.borrow_mut().push(m.to_owned()));
    /// info.log("node `x` skipped");
    ///
    /// assert_eq!(messages.borrow().len(), 1);
    /// ```
    pub fn set_log_hook(&mut self, hook: impl Fn(&str) + 'static) {
        self.log_hook = Some(Rc::new(hook));
    }

    pub fn clear_log_hook(&mut self) {
        self.log_hook = None;
    }

    pub(crate) fn log_hook(&self) -> Option<&LogHook> {
        self.log_hook.as_ref()
    }

    pub(crate) fn with_log_hook(mut self, hook: Option<LogHook>) -> Self {
        self.log_hook = hook;
        self
    }

    /// Reports a recoverable problem: forwards to [`log::warn!`] and the hook.
    pub fn log(&self, message: &str) {
        log::warn!("{message}");
        if let Some(hook) = &self.log_hook {
            hook(message);
        }
    }
}

impl Default for Info {
    #[inline]
    fn default() -> Self {
        Self::complete()
    }
}

impl PartialEq for Info {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version && self.flags == other.flags
    }
}

impl fmt::Debug for Info {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Info")
            .field("version", &self.version)
            .field("flags", &self.flags)
            .field("log_hook", &self.log_hook.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{Endian, Flags, Info};

    #[test]
    fn presets() {
        assert_eq!(Info::complete().flags(), Flags::all());
        assert_eq!(Info::pure().flags(), Flags::LITTLE_ENDIAN);
        assert_eq!(
            Info::minimal().flags(),
            Flags::LITTLE_ENDIAN
                | Flags::BINARY_NAMES
                | Flags::SIZE_INFO
                | Flags::VALUE_ENCAPSULATION
        );
    }

    #[test]
    fn linkage_forces_encapsulation_only() {
        let info = Info::new(Flags::LINKAGE_INFO, 3);
        assert!(info.has_value_encapsulation());
        assert!(!info.has_size_info());
        assert_eq!(info.version(), 3);
        assert_eq!(info.endianness(), Endian::Big);
    }

    #[test]
    fn disabling_implied_flag_is_corrected() {
        let mut info = Info::complete();
        info.disable(Flags::VALUE_ENCAPSULATION | Flags::SIZE_INFO);
        assert!(info.has_value_encapsulation());
        assert!(info.has_size_info());

        info.disable(Flags::TYPE_INFO | Flags::BINARY_NAMES | Flags::LINKAGE_INFO);
        info.disable(Flags::VALUE_ENCAPSULATION | Flags::SIZE_INFO);
        assert_eq!(info.flags(), Flags::LITTLE_ENDIAN);
    }

    #[test]
    fn endianness_toggle() {
        let mut info = Info::pure();
        info.set_endianness(Endian::Big);
        assert_eq!(info.flags(), Flags::empty());
        info.set_endianness(Endian::Little);
        assert_eq!(info.endianness(), Endian::Little);
    }
}
