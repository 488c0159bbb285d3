// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Lookup of DDS Security artifacts inside an enclave directory.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Error, Result};

/// Friendly name -> file name that must exist in the enclave directory.
pub const REQUIRED_SECURITY_FILES: [(&str, &str); 6] = [
    ("IDENTITY_CA", "identity_ca.cert.pem"),
    ("CERTIFICATE", "cert.pem"),
    ("PRIVATE_KEY", "key.pem"),
    ("PERMISSIONS_CA", "permissions_ca.cert.pem"),
    ("GOVERNANCE", "governance.p7s"),
    ("PERMISSIONS", "permissions.p7s"),
];

/// Files reported only when present.
pub const OPTIONAL_SECURITY_FILES: [(&str, &str); 1] = [("CRL", "crl.pem")];

/// Map each security artifact under `secure_root` to `prefix` + its path.
///
/// `prefix` is typically a URI scheme such as `"file://"`. Fails with
/// [`Error::MissingSecurityFile`] on the first required file that is not a
/// regular file; nothing is returned in that case.
pub fn get_security_files(prefix: &str, secure_root: &Path) -> Result<BTreeMap<String, String>> {
    let mut files = BTreeMap::new();

    for (name, file) in REQUIRED_SECURITY_FILES {
        let full_path = secure_root.join(file);
        if !full_path.is_file() {
            log::debug!(
                "[security] required file '{}' missing in {}",
                file,
                secure_root.display()
            );
            return Err(Error::MissingSecurityFile(full_path));
        }
        files.insert(name.to_string(), format!("{}{}", prefix, full_path.display()));
    }

    for (name, file) in OPTIONAL_SECURITY_FILES {
        let full_path = secure_root.join(file);
        if full_path.is_file() {
            files.insert(name.to_string(), format!("{}{}", prefix, full_path.display()));
        }
    }

    Ok(files)
}
