//! Backend for hosts without COM automation.

use super::{AutomationBackend, EtabsApplication};
use crate::error::{EtabsError, Result};

/// Reports the application as not installed and refuses to connect.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedBackend;

impl AutomationBackend for UnsupportedBackend {
    fn is_installed(&self) -> bool {
        false
    }

    fn is_running(&self) -> Result<bool> {
        Ok(false)
    }

    fn create(&self) -> Result<Box<dyn EtabsApplication>> {
        Err(EtabsError::Unsupported)
    }

    fn attach(&self) -> Result<Box<dyn EtabsApplication>> {
        Err(EtabsError::Unsupported)
    }
}
