use std::path::Path;

use car_common::control::native::NativeParams;
use car_common::manifest::NativeSymbols;
use car_control_unit::bridge::NativeLoader;
use car_control_unit::native::NativeLaw;
use car_control_unit::variant::ControlLaw;
use parking_lot::{Mutex, MutexGuard};

mod equivalence;
mod fallback;
mod replay;
mod scenarios;
mod verifier;

// The linked-in native library keeps one process-wide state.
static NATIVE_LOCK: Mutex<()> = parking_lot::const_mutex(());

/// Serialize access to the linked-in native library.
pub fn native_lock() -> MutexGuard<'static, ()> {
    NATIVE_LOCK.lock()
}

/// Native law backed by the statically linked `car_native`.
pub fn linked_native(params: &NativeParams) -> NativeLaw {
    unsafe { NativeLaw::from_symbols(car_native::symbol_table(), params) }.unwrap()
}

/// Bridge loader that ignores the artifact path and uses `symbols`.
pub fn linked_loader(symbols: NativeSymbols) -> NativeLoader {
    Box::new(move |_: &Path, params: &NativeParams| {
        let law = unsafe { NativeLaw::from_symbols(symbols, params) }?;
        Ok(Box::new(law) as Box<dyn ControlLaw>)
    })
}
