// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::{BootstrapError, log_action};
use crate::runtime_paths::USERS_FILE_NAME;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

/// Creates an empty `users.yaml`. Accounts only come into existence through signup.
pub fn ensure_users(root: &Path) -> Result<bool, BootstrapError> {
    let users_path = root.join(USERS_FILE_NAME);
    if users_path.exists() {
        return Ok(false);
    }

    let mut file = match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&users_path)
    {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(err) => return Err(BootstrapError::Io(err)),
    };

    file.write_all(b"{}\n")?;
    file.sync_all()?;

    log_action(format!("created empty {}", USERS_FILE_NAME));

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test_fixtures::TestFixtureRoot;
    use std::fs;

    #[test]
    fn ensure_users_leaves_existing_file_alone() {
        let fixture = TestFixtureRoot::new_unique("bootstrap-users").unwrap();
        let users_path = fixture.path().join(USERS_FILE_NAME);
        fs::write(&users_path, "existing: data\n").unwrap();

        assert!(!ensure_users(fixture.path()).expect("ensure users"));
        assert_eq!(fs::read_to_string(&users_path).unwrap(), "existing: data\n");
    }
}
