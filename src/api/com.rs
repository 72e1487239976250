//! ETABS automation over COM late binding.
//!
//! The API object is reached through `IDispatch` by member name, so no type
//! library has to be present at build time. Object graph used:
//!
//! ```text
//! ETABSObject.ApplicationStart()
//! ETABSObject.SapModel.GetVersion(ref Version, ref VersionNumber)
//! ETABSObject.SapModel.GetModelFilename(IncludePath)
//! ETABSObject.SapModel.File.OpenFile(FileName)
//! ETABSObject.SapModel.File.ExportFile(FileName, FileType)
//! ETABSObject.SapModel.Analyze.GetCaseStatus(ref Count, ref Names, ref Status)
//! ```

use super::{AutomationBackend, EtabsApplication};
use crate::error::{EtabsError, Result};
use crate::model::CaseStatus;
use std::ffi::c_void;
use std::mem::ManuallyDrop;
use std::path::Path;
use std::ptr;

use windows::core::{Interface, BSTR, GUID, IUnknown, PCWSTR};
use windows::Win32::Foundation::VARIANT_BOOL;
use windows::Win32::System::Com::{
    CLSIDFromProgID, CoCreateInstance, CoInitializeEx, CoUninitialize, IDispatch, CLSCTX_ALL,
    COINIT_APARTMENTTHREADED, DISPATCH_FLAGS, DISPATCH_METHOD, DISPATCH_PROPERTYGET, DISPPARAMS,
    EXCEPINFO, SAFEARRAY,
};
use windows::Win32::System::Ole::{
    GetActiveObject, SafeArrayDestroy, SafeArrayGetElement, SafeArrayGetLBound,
    SafeArrayGetUBound,
};
use windows::Win32::System::Variant::{
    VariantClear, VARENUM, VARIANT, VT_ARRAY, VT_BOOL, VT_BSTR, VT_BYREF, VT_DISPATCH, VT_I2,
    VT_I4, VT_R8, VT_UI4,
};

const LOCALE_USER_DEFAULT: u32 = 0x0400;

/// COM apartment for the current thread, released on drop.
struct ComApartment {
    initialized: bool,
}

impl ComApartment {
    fn enter() -> Self {
        // S_FALSE (already initialized) also counts as success and must be balanced.
        let initialized = unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) }.is_ok();
        if !initialized {
            tracing::debug!("CoInitializeEx failed; COM calls will likely fail");
        }
        Self { initialized }
    }
}

impl Drop for ComApartment {
    fn drop(&mut self) {
        if self.initialized {
            unsafe { CoUninitialize() };
        }
    }
}

/// COM backend bound to one ProgID.
pub struct ComBackend {
    prog_id: String,
    _apartment: ComApartment,
}

impl ComBackend {
    pub fn new(prog_id: impl Into<String>) -> Self {
        Self {
            prog_id: prog_id.into(),
            _apartment: ComApartment::enter(),
        }
    }

    fn clsid(&self) -> Result<GUID> {
        let wide = to_wide(&self.prog_id);
        unsafe { CLSIDFromProgID(PCWSTR(wide.as_ptr())) }
            .map_err(|e| EtabsError::com("CLSIDFromProgID", e.to_string()))
    }

    fn active_object(&self) -> Result<IDispatch> {
        let clsid = self.clsid()?;
        let mut unknown: Option<IUnknown> = None;
        unsafe { GetActiveObject(&clsid, None, &mut unknown) }
            .map_err(|e| EtabsError::com("GetActiveObject", e.to_string()))?;

        unknown
            .ok_or(EtabsError::NotConnected)?
            .cast::<IDispatch>()
            .map_err(|e| EtabsError::com("QueryInterface(IDispatch)", e.to_string()))
    }
}

impl AutomationBackend for ComBackend {
    fn is_installed(&self) -> bool {
        match self.clsid() {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("Install probe failed: {}", e);
                false
            }
        }
    }

    fn is_running(&self) -> Result<bool> {
        Ok(self.active_object().is_ok())
    }

    fn create(&self) -> Result<Box<dyn EtabsApplication>> {
        let clsid = self.clsid()?;
        let api: IDispatch = unsafe { CoCreateInstance(&clsid, None, CLSCTX_ALL) }
            .map_err(|e| EtabsError::com("CoCreateInstance", e.to_string()))?;
        let api = Dispatch(api);

        let ret = variant_to_i32(&api.call("ApplicationStart", &mut [])?)?;
        if ret != 0 {
            return Err(EtabsError::Status {
                call: "ApplicationStart",
                code: ret,
            });
        }

        Ok(Box::new(ComApplication::new(api)?))
    }

    fn attach(&self) -> Result<Box<dyn EtabsApplication>> {
        let api = Dispatch(self.active_object()?);
        Ok(Box::new(ComApplication::new(api)?))
    }
}

/// Live application reached through its `SapModel` object.
struct ComApplication {
    // Keeps the application object referenced for the lifetime of the handle.
    _api: Dispatch,
    model: Dispatch,
}

impl ComApplication {
    fn new(api: Dispatch) -> Result<Self> {
        let model = api.object("SapModel")?;
        Ok(Self { _api: api, model })
    }
}

impl EtabsApplication for ComApplication {
    fn version(&self) -> Result<String> {
        let mut version = BSTR::new();
        let mut number = 0f64;
        let mut args = [
            OwnedVariant::by_ref_bstr(&mut version),
            OwnedVariant::by_ref_f64(&mut number),
        ];

        let ret = variant_to_i32(&self.model.call("GetVersion", &mut args)?)?;
        drop(args);
        if ret != 0 {
            return Err(EtabsError::Status {
                call: "GetVersion",
                code: ret,
            });
        }

        Ok(version.to_string())
    }

    fn model_path(&self) -> Result<String> {
        let mut args = [OwnedVariant::boolean(true)];
        let result = self.model.call("GetModelFilename", &mut args)?;
        variant_to_string(&result)
    }

    fn open_file(&mut self, path: &Path) -> Result<i32> {
        let file = self.model.object("File")?;
        let mut args = [OwnedVariant::string(&path_text(path)?)];
        variant_to_i32(&file.call("OpenFile", &mut args)?)
    }

    fn case_statuses(&self) -> Result<Vec<CaseStatus>> {
        let analyze = self.model.object("Analyze")?;

        let mut count = 0i32;
        let mut names = SafeArray::null();
        let mut statuses = SafeArray::null();
        let mut args = [
            OwnedVariant::by_ref_i32(&mut count),
            OwnedVariant::by_ref_array(&mut names.0, VT_BSTR),
            OwnedVariant::by_ref_array(&mut statuses.0, VT_I4),
        ];

        let ret = variant_to_i32(&analyze.call("GetCaseStatus", &mut args)?)?;
        drop(args);
        if ret != 0 {
            return Err(EtabsError::Status {
                call: "GetCaseStatus",
                code: ret,
            });
        }

        let names = names.bstrs()?;
        let statuses = statuses.i32s()?;
        Ok(names
            .into_iter()
            .zip(statuses)
            .take(count.max(0) as usize)
            .map(|(name, status)| CaseStatus::new(name, status))
            .collect())
    }

    fn export_file(&mut self, path: &Path, format_code: i32) -> Result<i32> {
        let file = self.model.object("File")?;
        let mut args = [
            OwnedVariant::string(&path_text(path)?),
            OwnedVariant::int(format_code),
        ];
        variant_to_i32(&file.call("ExportFile", &mut args)?)
    }
}

/// Late-bound automation object.
struct Dispatch(IDispatch);

impl Dispatch {
    fn dispid(&self, name: &'static str) -> Result<i32> {
        let wide = to_wide(name);
        let names = [PCWSTR(wide.as_ptr())];
        let mut id = 0i32;
        unsafe {
            self.0
                .GetIDsOfNames(&GUID::zeroed(), names.as_ptr(), 1, LOCALE_USER_DEFAULT, &mut id)
        }
        .map_err(|e| EtabsError::com(name, e.to_string()))?;
        Ok(id)
    }

    /// Invoke `name` with arguments in declaration order.
    fn invoke(
        &self,
        name: &'static str,
        flags: DISPATCH_FLAGS,
        args: &mut [OwnedVariant],
    ) -> Result<OwnedVariant> {
        let id = self.dispid(name)?;

        // IDispatch expects arguments last-to-first.
        let mut raw: Vec<VARIANT> = args.iter().rev().map(|a| a.0.clone()).collect();
        let params = DISPPARAMS {
            rgvarg: if raw.is_empty() {
                ptr::null_mut()
            } else {
                raw.as_mut_ptr()
            },
            rgdispidNamedArgs: ptr::null_mut(),
            cArgs: raw.len() as u32,
            cNamedArgs: 0,
        };

        let mut result = OwnedVariant::empty();
        let mut excep = EXCEPINFO::default();
        let mut arg_err = 0u32;
        let outcome = unsafe {
            self.0.Invoke(
                id,
                &GUID::zeroed(),
                LOCALE_USER_DEFAULT,
                flags,
                &params,
                Some(&mut result.0),
                Some(&mut excep),
                Some(&mut arg_err),
            )
        };

        // `raw` holds shallow copies; ownership stays with `args`.
        std::mem::forget(raw);

        outcome.map_err(|e| {
            let detail = excep.bstrDescription.to_string();
            if detail.is_empty() {
                EtabsError::com(name, e.to_string())
            } else {
                EtabsError::com(name, detail)
            }
        })?;
        Ok(result)
    }

    fn call(&self, name: &'static str, args: &mut [OwnedVariant]) -> Result<OwnedVariant> {
        self.invoke(
            name,
            DISPATCH_FLAGS(DISPATCH_METHOD.0 | DISPATCH_PROPERTYGET.0),
            args,
        )
    }

    fn object(&self, name: &'static str) -> Result<Dispatch> {
        let value = self.invoke(name, DISPATCH_PROPERTYGET, &mut [])?;
        unsafe {
            let inner = &value.0.Anonymous.Anonymous;
            if inner.vt != VT_DISPATCH {
                return Err(EtabsError::com(
                    name,
                    format!("expected object, got vt {}", inner.vt.0),
                ));
            }
            let dispatch: Option<IDispatch> = (*inner.Anonymous.pdispVal).clone();
            dispatch
                .map(Dispatch)
                .ok_or_else(|| EtabsError::com(name, "returned a null object"))
        }
    }
}

/// VARIANT that is cleared when dropped.
struct OwnedVariant(VARIANT);

impl OwnedVariant {
    fn empty() -> Self {
        Self(VARIANT::default())
    }

    fn with(
        vt: VARENUM,
        fill: impl FnOnce(&mut windows::Win32::System::Variant::VARIANT_0_0_0),
    ) -> Self {
        let mut v = VARIANT::default();
        unsafe {
            let inner = &mut *v.Anonymous.Anonymous;
            inner.vt = vt;
            fill(&mut inner.Anonymous);
        }
        Self(v)
    }

    fn string(s: &str) -> Self {
        Self::with(VT_BSTR, |u| u.bstrVal = ManuallyDrop::new(BSTR::from(s)))
    }

    fn int(value: i32) -> Self {
        Self::with(VT_I4, |u| u.lVal = value)
    }

    fn boolean(value: bool) -> Self {
        Self::with(VT_BOOL, |u| u.boolVal = VARIANT_BOOL(if value { -1 } else { 0 }))
    }

    fn by_ref_i32(target: &mut i32) -> Self {
        Self::with(VARENUM(VT_BYREF.0 | VT_I4.0), |u| u.plVal = target)
    }

    fn by_ref_f64(target: &mut f64) -> Self {
        Self::with(VARENUM(VT_BYREF.0 | VT_R8.0), |u| u.pdblVal = target)
    }

    fn by_ref_bstr(target: &mut BSTR) -> Self {
        Self::with(VARENUM(VT_BYREF.0 | VT_BSTR.0), |u| u.pbstrVal = target)
    }

    fn by_ref_array(target: &mut *mut SAFEARRAY, element: VARENUM) -> Self {
        Self::with(VARENUM(VT_BYREF.0 | VT_ARRAY.0 | element.0), |u| {
            u.pparray = target
        })
    }
}

impl Drop for OwnedVariant {
    fn drop(&mut self) {
        // By-reference variants only reset their tag; referenced storage is untouched.
        unsafe {
            let _ = VariantClear(&mut self.0);
        }
    }
}

/// SAFEARRAY returned through a by-reference argument.
struct SafeArray(*mut SAFEARRAY);

impl SafeArray {
    fn null() -> Self {
        Self(ptr::null_mut())
    }

    fn bounds(&self) -> Result<Option<(i32, i32)>> {
        if self.0.is_null() {
            return Ok(None);
        }
        unsafe {
            let lower = SafeArrayGetLBound(self.0, 1)
                .map_err(|e| EtabsError::com("SafeArrayGetLBound", e.to_string()))?;
            let upper = SafeArrayGetUBound(self.0, 1)
                .map_err(|e| EtabsError::com("SafeArrayGetUBound", e.to_string()))?;
            Ok(Some((lower, upper)))
        }
    }

    fn bstrs(&self) -> Result<Vec<String>> {
        let mut out = Vec::new();
        if let Some((lower, upper)) = self.bounds()? {
            for index in lower..=upper {
                let mut value = BSTR::new();
                unsafe {
                    SafeArrayGetElement(self.0, &index, &mut value as *mut BSTR as *mut c_void)
                }
                .map_err(|e| EtabsError::com("SafeArrayGetElement", e.to_string()))?;
                out.push(value.to_string());
            }
        }
        Ok(out)
    }

    fn i32s(&self) -> Result<Vec<i32>> {
        let mut out = Vec::new();
        if let Some((lower, upper)) = self.bounds()? {
            for index in lower..=upper {
                let mut value = 0i32;
                unsafe {
                    SafeArrayGetElement(self.0, &index, &mut value as *mut i32 as *mut c_void)
                }
                .map_err(|e| EtabsError::com("SafeArrayGetElement", e.to_string()))?;
                out.push(value);
            }
        }
        Ok(out)
    }
}

impl Drop for SafeArray {
    fn drop(&mut self) {
        if !self.0.is_null() {
            unsafe {
                let _ = SafeArrayDestroy(self.0);
            }
        }
    }
}

fn variant_to_i32(value: &OwnedVariant) -> Result<i32> {
    unsafe {
        let inner = &value.0.Anonymous.Anonymous;
        match inner.vt {
            vt if vt == VT_I4 => Ok(inner.Anonymous.lVal),
            vt if vt == VT_I2 => Ok(inner.Anonymous.iVal as i32),
            vt if vt == VT_UI4 => Ok(inner.Anonymous.ulVal as i32),
            vt => Err(EtabsError::com(
                "status",
                format!("expected integer, got vt {}", vt.0),
            )),
        }
    }
}

fn variant_to_string(value: &OwnedVariant) -> Result<String> {
    unsafe {
        let inner = &value.0.Anonymous.Anonymous;
        if inner.vt != VT_BSTR {
            return Err(EtabsError::com(
                "string",
                format!("expected string, got vt {}", inner.vt.0),
            ));
        }
        Ok(inner.Anonymous.bstrVal.to_string())
    }
}

fn path_text(path: &Path) -> Result<String> {
    path.to_str()
        .map(str::to_string)
        .ok_or_else(|| EtabsError::InvalidPath {
            path: path.to_path_buf(),
        })
}

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}
