//! Native control-law variant.
//!
//! Loads the `car_native` shared library with `libloading`, resolves the
//! full symbol manifest, checks the manifest version and installs the
//! configured [`NativeParams`] through `car_configure`. Each tick the
//! feedback and raw samples are pushed across the ABI, `car_control_step`
//! runs, and commands, distances and drive mode are read back.

use std::path::{Path, PathBuf};

use car_common::control::native::NativeParams;
use car_common::control::state::{Commands, Distances, DriveMode, LawOutput, TickInput};
use car_common::manifest::{MANIFEST_VERSION, ManifestSymbols, NativeSymbols, SYMBOL_NAMES, status};
use libloading::Library;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::variant::{ControlLaw, LawError, VariantKind, check_command_range};

/// Failure to bring up the native variant.
#[derive(Debug, Error)]
pub enum NativeError {
    /// The shared library could not be opened.
    #[error("failed to load {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    /// Manifest entries not exported by the library.
    #[error("missing symbols: {}", .0.join(", "))]
    MissingSymbols(Vec<&'static str>),

    /// The library implements another manifest version.
    #[error("manifest version {found}, expected {expected}")]
    VersionMismatch { found: u32, expected: u32 },

    /// `car_configure` rejected the parameter block.
    #[error("car_configure returned status {0}")]
    Configure(i32),
}

/// Open a shared library.
pub fn open_library(path: &Path) -> Result<Library, NativeError> {
    // SAFETY: opening runs the library's initialisers. Only artifacts of the
    // `car_native` package are loaded here.
    unsafe { Library::new(path) }.map_err(|source| NativeError::Load {
        path: path.to_path_buf(),
        source,
    })
}

/// Manifest entries the library exports.
pub fn probe(library: &Library) -> ManifestSymbols {
    let mut present = ManifestSymbols::empty();
    for (flag, name) in SYMBOL_NAMES {
        // SAFETY: the address is only checked for presence, never called.
        if unsafe { library.get::<*const ()>(name.as_bytes()) }.is_ok() {
            present |= flag;
        }
    }
    present
}

/// Read the exported manifest version, if the entry exists.
pub fn manifest_version(library: &Library) -> Option<u32> {
    // SAFETY: `car_manifest_version` has the same signature in every
    // manifest version that exports it.
    unsafe {
        library
            .get::<car_common::manifest::ManifestVersionFn>(b"car_manifest_version")
            .ok()
            .map(|f| f())
    }
}

/// Resolve every manifest entry.
pub fn resolve(library: &Library) -> Result<NativeSymbols, NativeError> {
    let missing = ManifestSymbols::all().difference(probe(library));
    if !missing.is_empty() {
        return Err(NativeError::MissingSymbols(missing.names().collect()));
    }
    // SAFETY: the pointer types of `NativeSymbols` are the signatures of the
    // exports of this manifest version; the caller checks the version before
    // calling anything but `car_manifest_version`.
    unsafe {
        Ok(NativeSymbols {
            manifest_version: symbol(library, "car_manifest_version")?,
            configure: symbol(library, "car_configure")?,
            set_power_feedback: symbol(library, "car_set_power_feedback")?,
            get_power_feedback: symbol(library, "car_get_power_feedback")?,
            set_steer_feedback: symbol(library, "car_set_steer_feedback")?,
            get_steer_feedback: symbol(library, "car_get_steer_feedback")?,
            ingest_front: symbol(library, "car_ingest_front")?,
            ingest_left: symbol(library, "car_ingest_left")?,
            ingest_right: symbol(library, "car_ingest_right")?,
            control_step: symbol(library, "car_control_step")?,
            power_command: symbol(library, "car_power_command")?,
            steer_command: symbol(library, "car_steer_command")?,
            distance_front: symbol(library, "car_distance_front")?,
            distance_left: symbol(library, "car_distance_left")?,
            distance_right: symbol(library, "car_distance_right")?,
            drive_mode: symbol(library, "car_drive_mode")?,
        })
    }
}

unsafe fn symbol<T: Copy>(library: &Library, name: &'static str) -> Result<T, NativeError> {
    // SAFETY: forwarded to the caller.
    unsafe { library.get::<T>(name.as_bytes()) }
        .map(|s| *s)
        .map_err(|_| NativeError::MissingSymbols(vec![name]))
}

/// The native control law behind the [`ControlLaw`] seam.
pub struct NativeLaw {
    symbols: NativeSymbols,
    params: NativeParams,
    // Keeps the code behind `symbols` mapped; `None` for statically linked
    // entry points.
    _library: Option<Library>,
}

impl std::fmt::Debug for NativeLaw {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeLaw")
            .field("dynamic", &self._library.is_some())
            .field("params", &self.params)
            .finish()
    }
}

impl NativeLaw {
    /// Load, verify and configure the library at `path`.
    pub fn load(path: &Path, params: &NativeParams) -> Result<Self, NativeError> {
        let library = open_library(path)?;
        let symbols = resolve(&library)?;
        // SAFETY: `symbols` come from `library`, which moves into the result.
        let law = unsafe { Self::from_parts(symbols, *params, Some(library)) }?;
        info!("Native control law loaded from {}", path.display());
        Ok(law)
    }

    /// Wrap entry points that are linked into this process.
    ///
    /// # Safety
    ///
    /// Every pointer must implement the manifest entry it is stored under
    /// and stay valid for the lifetime of the returned value.
    pub unsafe fn from_symbols(
        symbols: NativeSymbols,
        params: &NativeParams,
    ) -> Result<Self, NativeError> {
        // SAFETY: forwarded to the caller.
        unsafe { Self::from_parts(symbols, *params, None) }
    }

    unsafe fn from_parts(
        symbols: NativeSymbols,
        params: NativeParams,
        library: Option<Library>,
    ) -> Result<Self, NativeError> {
        // SAFETY: forwarded to the caller.
        let found = unsafe { (symbols.manifest_version)() };
        if found != MANIFEST_VERSION {
            return Err(NativeError::VersionMismatch {
                found,
                expected: MANIFEST_VERSION,
            });
        }
        let mut law = Self {
            symbols,
            params,
            _library: library,
        };
        law.configure(&params)?;
        Ok(law)
    }

    /// Install a new parameter block; clears the library's tick memory.
    pub fn configure(&mut self, params: &NativeParams) -> Result<(), NativeError> {
        // SAFETY: `symbols` are valid for the lifetime of `self`; `params`
        // outlives the call.
        let code = unsafe { (self.symbols.configure)(params) };
        if code != status::OK {
            return Err(NativeError::Configure(code));
        }
        self.params = *params;
        Ok(())
    }

    pub fn params(&self) -> &NativeParams {
        &self.params
    }

    /// Feedback as currently stored by the library.
    pub fn stored_feedback(&self) -> (i8, i8) {
        // SAFETY: `symbols` are valid for the lifetime of `self`.
        unsafe {
            (
                (self.symbols.get_power_feedback)(),
                (self.symbols.get_steer_feedback)(),
            )
        }
    }
}

impl ControlLaw for NativeLaw {
    fn kind(&self) -> VariantKind {
        VariantKind::Native
    }

    fn step(&mut self, input: &TickInput) -> Result<LawOutput, LawError> {
        let frame = &input.frame;
        if frame.side_angle_factor == 0 {
            warn!(
                left = frame.left_raw,
                right = frame.right_raw,
                "angle factor 0 substituted by 1"
            );
        }
        let s = &self.symbols;
        // SAFETY: `symbols` are valid for the lifetime of `self`.
        let (commands, distances, raw_mode) = unsafe {
            (s.set_power_feedback)(input.feedback.power);
            (s.set_steer_feedback)(input.feedback.steer_angle);
            (s.ingest_front)(frame.front_raw);
            (s.ingest_left)(frame.left_raw, frame.side_angle_factor);
            (s.ingest_right)(frame.right_raw, frame.side_angle_factor);
            match (s.control_step)() {
                status::OK => {}
                status::PANICKED => return Err(LawError::Panicked),
                code => return Err(LawError::Status(code)),
            }
            (
                Commands {
                    power: (s.power_command)(),
                    steer: (s.steer_command)(),
                },
                Distances {
                    front: (s.distance_front)(),
                    left: (s.distance_left)(),
                    right: (s.distance_right)(),
                },
                (s.drive_mode)(),
            )
        };
        check_command_range(&commands)?;
        let mode = DriveMode::from_u8(raw_mode).ok_or(LawError::UnknownMode(raw_mode))?;
        debug!(
            ?mode,
            power = commands.power,
            steer = commands.steer,
            "native tick"
        );
        Ok(LawOutput {
            commands,
            distances,
            mode,
        })
    }

    fn reset(&mut self) {
        let params = self.params;
        if let Err(e) = self.configure(&params) {
            warn!("Native reset failed: {e}");
        }
    }
}
