//! Hardware capability flags and kernel path selection.
//!
//! [`HardwareFlags`] is an opaque capability mask. Callers obtain it from
//! [`HardwareFlags::detect`] once per process and hand it to whatever
//! strategy object needs to choose an execution path. The mask can only be
//! narrowed below what the CPU reports, never widened: every constructor
//! that accepts raw bits clamps them to the detected set, so an accelerated
//! path is never selected on hardware that cannot run it.

use std::fmt;
use std::sync::OnceLock;

/// Opaque set of CPU capabilities relevant to batch kernels.
///
/// Consumers must treat the individual bits as implementation detail. The
/// only contract is that a kernel family maps a mask to one
/// [`KernelPath`] via [`KernelPath::select`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HardwareFlags(u64);

impl HardwareFlags {
    /// SSE 4.2 (x86-64).
    ///
    /// Reserved: detected and carried through the mask, but no
    /// [`KernelPath`] depends on it yet.
    pub const SSE4_2: Self = Self(1 << 0);
    /// AVX2 256-bit integer SIMD (x86-64).
    pub const AVX2: Self = Self(1 << 1);
    /// BMI2 bit deposit / extract (x86-64).
    pub const BMI2: Self = Self(1 << 2);
    /// AVX-512 foundation + byte/word (x86-64).
    ///
    /// Reserved like [`SSE4_2`](Self::SSE4_2); [`KernelPath::select`]
    /// ignores it.
    pub const AVX512: Self = Self(1 << 3);

    const ALL: u64 = Self::SSE4_2.0 | Self::AVX2.0 | Self::BMI2.0 | Self::AVX512.0;

    /// The empty mask. Always selects the scalar path.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Capabilities reported by the running CPU.
    ///
    /// Probed once per process; later calls return the cached value.
    pub fn detect() -> Self {
        static DETECTED: OnceLock<HardwareFlags> = OnceLock::new();
        *DETECTED.get_or_init(|| {
            let flags = Self::probe();
            log::debug!("detected hardware flags: {flags:?}");
            flags
        })
    }

    #[cfg(target_arch = "x86_64")]
    fn probe() -> Self {
        let mut bits = 0;
        if std::arch::is_x86_feature_detected!("sse4.2") {
            bits |= Self::SSE4_2.0;
        }
        if std::arch::is_x86_feature_detected!("avx2") {
            bits |= Self::AVX2.0;
        }
        if std::arch::is_x86_feature_detected!("bmi2") {
            bits |= Self::BMI2.0;
        }
        if std::arch::is_x86_feature_detected!("avx512f")
            && std::arch::is_x86_feature_detected!("avx512bw")
        {
            bits |= Self::AVX512.0;
        }
        Self(bits)
    }

    #[cfg(not(target_arch = "x86_64"))]
    fn probe() -> Self {
        Self(0)
    }

    /// Build a mask from raw bits, dropping anything unknown or not
    /// supported by the running CPU.
    pub fn from_bits_truncate(bits: u64) -> Self {
        Self(bits & Self::ALL).intersection(Self::detect())
    }

    /// Raw bits of the mask.
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Whether every capability in `other` is also in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Capabilities present in both masks.
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Capabilities present in either mask.
    ///
    /// The result is not clamped; pass it through a consumer that clamps
    /// (such as [`KernelPath::select`]) before relying on it.
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Whether no capability is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for HardwareFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(HardwareFlags, &str); 4] = [
            (HardwareFlags::SSE4_2, "SSE4_2"),
            (HardwareFlags::AVX2, "AVX2"),
            (HardwareFlags::BMI2, "BMI2"),
            (HardwareFlags::AVX512, "AVX512"),
        ];
        let mut set = f.debug_set();
        for (flag, name) in NAMES {
            if self.contains(flag) {
                set.entry(&format_args!("{name}"));
            }
        }
        set.finish()
    }
}

/// Closed set of execution paths a kernel family can run on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KernelPath {
    /// Portable 64-bit word-at-a-time code.
    Scalar,
    /// x86-64 AVX2 + BMI2 code.
    Avx2,
}

impl KernelPath {
    /// Pick the fastest path the given flags allow.
    ///
    /// `flags` is clamped to the detected capabilities first, so a mask
    /// assembled by hand cannot select a path the CPU cannot execute.
    pub fn select(flags: HardwareFlags) -> Self {
        let usable = flags.intersection(HardwareFlags::detect());
        let path = if cfg!(target_arch = "x86_64")
            && usable.contains(HardwareFlags::AVX2.union(HardwareFlags::BMI2))
        {
            Self::Avx2
        } else {
            Self::Scalar
        };
        log::trace!("kernel path {path:?} selected for {flags:?}");
        path
    }

    /// Whether this is an accelerated (non-scalar) path.
    pub fn is_accelerated(self) -> bool {
        !matches!(self, Self::Scalar)
    }
}

impl fmt::Display for KernelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar => write!(f, "scalar"),
            Self::Avx2 => write!(f, "avx2"),
        }
    }
}
