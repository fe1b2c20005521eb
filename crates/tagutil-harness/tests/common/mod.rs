//! Shared helpers for integration tests.
//!
//! Most tests substitute a small shell script for tagutil. It understands
//! just enough of the real command line to exercise the harness:
//! `-F fmt`, `-Y`, `-h`, `load:- FILE`, `print FILE` and `edit FILE`.
//! Tags are kept next to the tune in `FILE.tags`.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tagutil_harness::{EditorTable, HarnessConfig, Session};
use tempfile::TempDir;

/// Makes the fake load print this text (and still succeed).
pub const NOISE_VAR: &str = "FAKE_TAGUTIL_NOISE";
/// Makes the fake load exit with status 3.
pub const FAIL_VAR: &str = "FAKE_TAGUTIL_FAIL";

const FAKE_TAGUTIL: &str = r##"#!/bin/sh
fmt=yml
yes=
while getopts F:YNh opt; do
    case $opt in
    F) fmt=$OPTARG ;;
    Y) yes=1 ;;
    N) yes= ;;
    h)
        echo "usage: tagutil [OPTION]... [ACTION:ARG]... [FILE]..." >&2
        echo "Options:" >&2
        echo "  -h     show this help" >&2
        echo "Actions:" >&2
        echo "  print            print tags (default action)" >&2
        exit 0 ;;
    *) exit 1 ;;
    esac
done
shift $((OPTIND - 1))
action=$1
file=$2
if [ ! -f "$file" ]; then
    echo "tagutil: $file: No such file or directory" >&2
    exit 1
fi
case $action in
load:-)
    if [ -n "$FAKE_TAGUTIL_NOISE" ]; then echo "$FAKE_TAGUTIL_NOISE"; fi
    if [ -n "$FAKE_TAGUTIL_FAIL" ]; then exit 3; fi
    cat > "$file.tags" ;;
print)
    if [ -s "$file.tags" ]; then
        if [ "$fmt" != yml ]; then echo "tagutil: $fmt: unsupported" >&2; exit 1; fi
        echo "# $file"
        # Plain scalars, as libyaml emits them.
        sed "s/^\(- [^:]*\): '\([0-9][0-9]*\)'\$/\1: \2/" "$file.tags"
    else
        echo "[]"
    fi ;;
edit)
    if [ -z "$yes" ]; then exit 1; fi
    tmp="$file.yml"
    cp "$file.tags" "$tmp" || exit 1
    "$EDITOR" "$tmp" || { rm -f "$tmp"; exit 2; }
    mv "$tmp" "$file.tags" ;;
*)
    echo "tagutil: $action: unknown action" >&2
    exit 1 ;;
esac
"##;

/// An executable script living in its own temporary directory.
pub struct Script {
    _dir: TempDir,
    pub path: PathBuf,
}

fn write_executable(path: &Path, body: &str) {
    fs::write(path, body).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// Writes `body` as an executable script called `name`.
///
/// Create scripts while holding a workspace: a child forked by another test
/// thread while the script is still open for writing makes exec fail with
/// "text file busy".
pub fn script(name: &str, body: &str) -> Script {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(name);
    write_executable(&path, body);
    Script { _dir: dir, path }
}

/// The fake tagutil described above, written once per test binary.
pub fn fake_tagutil() -> &'static Path {
    static FAKE: OnceLock<PathBuf> = OnceLock::new();
    FAKE.get_or_init(|| {
        let path = Path::new(env!("CARGO_TARGET_TMPDIR"))
            .join(format!("fake-tagutil-{}", std::process::id()));
        write_executable(&path, FAKE_TAGUTIL);
        path
    })
}

/// A session driving `executable`, with the stub editor registered.
pub fn session_for(executable: &Path) -> Session {
    tagutil_harness::init_logging();
    Session::new(HarnessConfig::default().executable(executable))
        .unwrap()
        .with_editors(EditorTable::with_stub(env!("CARGO_BIN_EXE_evil-editor")))
}
