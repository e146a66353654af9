// Copyright (c) Redset Contributors
// SPDX-License-Identifier: Apache-2.0

use std::path::{Component, Path, PathBuf};

/// Collapses `.`, repeated separators, and `a/../` segments out of `path`,
/// the way the source reduces every path it stores in a descriptor so two
/// ranks that spell the same store differently still agree once reduced.
///
/// This is purely lexical: it never touches the filesystem, so it also
/// works for paths that do not exist yet (e.g. a hidden cache directory that
/// has not been created).
pub fn reduce_path(path: &str) -> String {
    let mut out = PathBuf::new();
    for component in Path::new(path).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !matches!(out.components().next_back(), Some(Component::RootDir) | None) {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        ".".to_string()
    } else {
        out.to_string_lossy().into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_dot_and_double_slash() {
        assert_eq!(reduce_path("/mnt/ssd//./scr.1234"), "/mnt/ssd/scr.1234");
    }

    #[test]
    fn collapses_parent_dir_segments() {
        assert_eq!(reduce_path("/mnt/ssd/foo/../scr.1234"), "/mnt/ssd/scr.1234");
    }

    #[test]
    fn leaves_already_reduced_path_untouched() {
        assert_eq!(reduce_path("/mnt/ssd/scr.1234"), "/mnt/ssd/scr.1234");
    }
}
