//! Runtime-loaded liborcon2
//!
//! The shared object is opened with `libloading` and every entry point the
//! bindings use is resolved once, up front. Handles keep the library mapped
//! for as long as they live.

use super::{DriverInfo, LorconBackend, NativeHandle};
use crate::config::LorconConfig;
use crate::error::{LorconError, LorconResult, LORCON_EGENERIC};
use crate::validation::sanitize_native_message;
use libc::{c_char, c_int, c_void};
use libloading::Library;
use std::ffi::{CStr, CString};
use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};
use std::sync::Arc;
use tracing::{debug, trace};

/// Opaque `lorcon_t`
#[repr(C)]
struct LorconRaw {
    _private: [u8; 0],
}

/// `lorcon_driver_t`, a singly linked list
#[repr(C)]
struct LorconDriverRaw {
    name: *mut c_char,
    details: *mut c_char,
    init_func: *mut c_void,
    autodetect_func: *mut c_void,
    next: *mut LorconDriverRaw,
}

type GetVersionFn = unsafe extern "C" fn() -> c_int;
type ListDriversFn = unsafe extern "C" fn() -> *mut LorconDriverRaw;
type FindDriverFn = unsafe extern "C" fn(*const c_char) -> *mut LorconDriverRaw;
type FreeDriverListFn = unsafe extern "C" fn(*mut LorconDriverRaw);
type CreateFn = unsafe extern "C" fn(*const c_char, *mut LorconDriverRaw) -> *mut LorconRaw;
type FreeFn = unsafe extern "C" fn(*mut LorconRaw);
type StatusFn = unsafe extern "C" fn(*mut LorconRaw) -> c_int;
type VoidFn = unsafe extern "C" fn(*mut LorconRaw);
type StringFn = unsafe extern "C" fn(*mut LorconRaw) -> *const c_char;
type SendBytesFn = unsafe extern "C" fn(*mut LorconRaw, c_int, *const u8) -> c_int;
type SetIntFn = unsafe extern "C" fn(*mut LorconRaw, c_int);
type SetIntStatusFn = unsafe extern "C" fn(*mut LorconRaw, c_int) -> c_int;
type SetStringFn = unsafe extern "C" fn(*mut LorconRaw, *const c_char);
type GetHwmacFn = unsafe extern "C" fn(*mut LorconRaw, *mut *mut u8) -> c_int;
type SetHwmacFn = unsafe extern "C" fn(*mut LorconRaw, c_int, *const u8) -> c_int;

struct Symbols {
    get_version: GetVersionFn,
    list_drivers: ListDriversFn,
    find_driver: FindDriverFn,
    auto_driver: FindDriverFn,
    free_driver_list: FreeDriverListFn,
    create: CreateFn,
    free: FreeFn,
    open_inject: StatusFn,
    open_monitor: StatusFn,
    open_injmon: StatusFn,
    close: VoidFn,
    get_error: StringFn,
    get_capiface: StringFn,
    send_bytes: SendBytesFn,
    set_timeout: SetIntFn,
    get_timeout: StatusFn,
    set_vap: SetStringFn,
    get_vap: StringFn,
    get_driver_name: StringFn,
    set_channel: SetIntStatusFn,
    get_channel: StatusFn,
    get_hwmac: GetHwmacFn,
    set_hwmac: SetHwmacFn,
}

struct LibraryInner {
    symbols: Symbols,
    path: PathBuf,
    // Declared last: dropped after nothing can call into it any more
    _library: Library,
}

/// liborcon2 loaded from disk
#[derive(Clone)]
pub struct LorconLibrary {
    inner: Arc<LibraryInner>,
}

unsafe fn symbol<T: Copy>(library: &Library, name: &str) -> LorconResult<T> {
    trace!("Resolving {}", name);
    let sym: libloading::Symbol<T> = library
        .get(name.as_bytes())
        .map_err(|e| LorconError::Library(format!("Missing symbol '{}': {}", name, e)))?;
    Ok(*sym)
}

impl LorconLibrary {
    /// Load liborcon2 from an explicit path
    ///
    /// # Safety
    /// Loading runs the library's initialisers; the file must be a genuine
    /// liborcon2 build exporting the C API this module declares.
    pub unsafe fn open<P: AsRef<Path>>(path: P) -> LorconResult<Self> {
        let path = path.as_ref();
        debug!("Loading liborcon2 from: {}", path.display());

        let library = Library::new(path)
            .map_err(|e| LorconError::Library(format!("Failed to load {}: {}", path.display(), e)))?;

        let symbols = Symbols {
            get_version: symbol(&library, "lorcon_get_version")?,
            list_drivers: symbol(&library, "lorcon_list_drivers")?,
            find_driver: symbol(&library, "lorcon_find_driver")?,
            auto_driver: symbol(&library, "lorcon_auto_driver")?,
            free_driver_list: symbol(&library, "lorcon_free_driver_list")?,
            create: symbol(&library, "lorcon_create")?,
            free: symbol(&library, "lorcon_free")?,
            open_inject: symbol(&library, "lorcon_open_inject")?,
            open_monitor: symbol(&library, "lorcon_open_monitor")?,
            open_injmon: symbol(&library, "lorcon_open_injmon")?,
            close: symbol(&library, "lorcon_close")?,
            get_error: symbol(&library, "lorcon_get_error")?,
            get_capiface: symbol(&library, "lorcon_get_capiface")?,
            send_bytes: symbol(&library, "lorcon_send_bytes")?,
            set_timeout: symbol(&library, "lorcon_set_timeout")?,
            get_timeout: symbol(&library, "lorcon_get_timeout")?,
            set_vap: symbol(&library, "lorcon_set_vap")?,
            get_vap: symbol(&library, "lorcon_get_vap")?,
            get_driver_name: symbol(&library, "lorcon_get_driver_name")?,
            set_channel: symbol(&library, "lorcon_set_channel")?,
            get_channel: symbol(&library, "lorcon_get_channel")?,
            get_hwmac: symbol(&library, "lorcon_get_hwmac")?,
            set_hwmac: symbol(&library, "lorcon_set_hwmac")?,
        };

        debug!("Loaded liborcon2 from: {}", path.display());
        Ok(Self {
            inner: Arc::new(LibraryInner {
                symbols,
                path: path.to_path_buf(),
                _library: library,
            }),
        })
    }

    /// Try every candidate from the configuration until one loads
    ///
    /// # Safety
    /// Same contract as [`LorconLibrary::open`] for whichever file is picked.
    pub unsafe fn load(config: &LorconConfig) -> LorconResult<Self> {
        let mut failures = Vec::new();

        for candidate in config.library_candidates() {
            // Absolute candidates that do not exist are not worth a dlopen
            if candidate.is_absolute() && !candidate.exists() {
                continue;
            }

            match Self::open(&candidate) {
                Ok(library) => return Ok(library),
                Err(e) => {
                    debug!("Skipping {}: {}", candidate.display(), e);
                    failures.push(e.to_string());
                }
            }
        }

        Err(LorconError::Library(if failures.is_empty() {
            "liborcon2 not found in any search path".to_string()
        } else {
            failures.join("; ")
        }))
    }

    /// Path the library was loaded from
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    fn symbols(&self) -> &Symbols {
        &self.inner.symbols
    }
}

/// Owns a driver list returned by liborcon2 and frees it on drop
struct DriverList<'a> {
    symbols: &'a Symbols,
    head: *mut LorconDriverRaw,
}

impl<'a> DriverList<'a> {
    fn new(symbols: &'a Symbols, head: *mut LorconDriverRaw) -> Self {
        Self { symbols, head }
    }

    fn is_empty(&self) -> bool {
        self.head.is_null()
    }

    fn first(&self) -> Option<DriverInfo> {
        if self.head.is_null() {
            return None;
        }
        Some(unsafe { driver_info(&*self.head) })
    }

    fn to_vec(&self) -> Vec<DriverInfo> {
        let mut drivers = Vec::new();
        let mut cursor = self.head;
        while !cursor.is_null() {
            let entry = unsafe { &*cursor };
            drivers.push(unsafe { driver_info(entry) });
            cursor = entry.next;
        }
        drivers
    }
}

impl Drop for DriverList<'_> {
    fn drop(&mut self) {
        if !self.head.is_null() {
            unsafe { (self.symbols.free_driver_list)(self.head) };
        }
    }
}

unsafe fn driver_info(entry: &LorconDriverRaw) -> DriverInfo {
    DriverInfo {
        name: owned_string(entry.name).unwrap_or_default(),
        details: owned_string(entry.details).unwrap_or_default(),
    }
}

unsafe fn owned_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
}

/// liborcon2 hands back `""` for names that were never set
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

impl LorconBackend for LorconLibrary {
    fn version(&self) -> i32 {
        unsafe { (self.symbols().get_version)() }
    }

    fn list_drivers(&self) -> Vec<DriverInfo> {
        let list = DriverList::new(self.symbols(), unsafe { (self.symbols().list_drivers)() });
        list.to_vec()
    }

    fn find_driver(&self, name: &str) -> Option<DriverInfo> {
        let name = CString::new(name).ok()?;
        let list = DriverList::new(self.symbols(), unsafe { (self.symbols().find_driver)(name.as_ptr()) });
        list.first()
    }

    fn auto_driver(&self, interface: &str) -> Option<DriverInfo> {
        let interface = CString::new(interface).ok()?;
        let list = DriverList::new(self.symbols(), unsafe { (self.symbols().auto_driver)(interface.as_ptr()) });
        list.first()
    }

    fn create(&self, interface: &str, driver: &str) -> Option<Box<dyn NativeHandle>> {
        let interface_c = CString::new(interface).ok()?;
        let driver_c = CString::new(driver).ok()?;

        let list = DriverList::new(self.symbols(), unsafe { (self.symbols().find_driver)(driver_c.as_ptr()) });
        if list.is_empty() {
            debug!("Driver {} vanished before lorcon_create", driver);
            return None;
        }

        let raw = unsafe { (self.symbols().create)(interface_c.as_ptr(), list.head) };
        let raw = NonNull::new(raw)?;
        debug!("Created lorcon context for {} ({})", interface, driver);

        Some(Box::new(FfiHandle {
            raw,
            library: Arc::clone(&self.inner),
            opened: false,
        }))
    }
}

/// One `lorcon_t` owned exclusively by this value
struct FfiHandle {
    raw: NonNull<LorconRaw>,
    library: Arc<LibraryInner>,
    opened: bool,
}

// The handle is never aliased; moving it to another thread is fine.
unsafe impl Send for FfiHandle {}

impl FfiHandle {
    fn symbols(&self) -> &Symbols {
        &self.library.symbols
    }

    fn ptr(&self) -> *mut LorconRaw {
        self.raw.as_ptr()
    }

    fn enter(&mut self, open: StatusFn) -> i32 {
        let status = unsafe { open(self.ptr()) };
        if status >= 0 {
            self.opened = true;
        }
        status
    }

    fn read_string(&self, getter: StringFn) -> Option<String> {
        unsafe { owned_string(getter(self.ptr())) }
    }
}

impl NativeHandle for FfiHandle {
    fn open_inject(&mut self) -> i32 {
        let open = self.symbols().open_inject;
        self.enter(open)
    }

    fn open_monitor(&mut self) -> i32 {
        let open = self.symbols().open_monitor;
        self.enter(open)
    }

    fn open_injmon(&mut self) -> i32 {
        let open = self.symbols().open_injmon;
        self.enter(open)
    }

    fn close(&mut self) {
        if self.opened {
            unsafe { (self.symbols().close)(self.ptr()) };
            self.opened = false;
        }
    }

    fn last_error(&self) -> String {
        self.read_string(self.symbols().get_error)
            .map(|msg| sanitize_native_message(&msg))
            .unwrap_or_default()
    }

    fn capture_interface(&self) -> Option<String> {
        non_empty(self.read_string(self.symbols().get_capiface))
    }

    fn send_bytes(&mut self, frame: &[u8]) -> i32 {
        let len = match c_int::try_from(frame.len()) {
            Ok(len) => len,
            Err(_) => return LORCON_EGENERIC,
        };
        unsafe { (self.symbols().send_bytes)(self.ptr(), len, frame.as_ptr()) }
    }

    fn set_timeout(&mut self, ms: i32) {
        unsafe { (self.symbols().set_timeout)(self.ptr(), ms) }
    }

    fn timeout(&self) -> i32 {
        unsafe { (self.symbols().get_timeout)(self.ptr()) }
    }

    fn set_vap(&mut self, vap: &str) {
        if let Ok(vap) = CString::new(vap) {
            unsafe { (self.symbols().set_vap)(self.ptr(), vap.as_ptr()) }
        }
    }

    fn vap(&self) -> Option<String> {
        non_empty(self.read_string(self.symbols().get_vap))
    }

    fn driver_name(&self) -> Option<String> {
        non_empty(self.read_string(self.symbols().get_driver_name))
    }

    fn set_channel(&mut self, channel: i32) -> i32 {
        unsafe { (self.symbols().set_channel)(self.ptr(), channel) }
    }

    fn channel(&self) -> i32 {
        unsafe { (self.symbols().get_channel)(self.ptr()) }
    }

    fn hwmac(&self) -> Result<[u8; 6], i32> {
        let mut mac: *mut u8 = ptr::null_mut();
        let status = unsafe { (self.symbols().get_hwmac)(self.ptr(), &mut mac) };

        if mac.is_null() {
            return Err(if status < 0 { status } else { LORCON_EGENERIC });
        }

        // The buffer is malloc()ed by liborcon2 and ours to free
        let result = if status == 6 {
            let mut octets = [0u8; 6];
            unsafe { ptr::copy_nonoverlapping(mac, octets.as_mut_ptr(), 6) };
            Ok(octets)
        } else if status < 0 {
            Err(status)
        } else {
            Err(LORCON_EGENERIC)
        };
        unsafe { libc::free(mac as *mut c_void) };
        result
    }

    fn set_hwmac(&mut self, mac: &[u8; 6]) -> i32 {
        unsafe { (self.symbols().set_hwmac)(self.ptr(), mac.len() as c_int, mac.as_ptr()) }
    }
}

impl Drop for FfiHandle {
    fn drop(&mut self) {
        self.close();
        unsafe { (self.symbols().free)(self.ptr()) };
        trace!("Freed lorcon context");
    }
}
