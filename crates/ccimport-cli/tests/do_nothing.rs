use std::process::Command;

#[test]
fn do_nothing_writes_sentinel_files() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let rs_out = tmp.path().join("api.rs");
    let cc_out = tmp.path().join("api_impl.cc");

    let status = Command::new(env!("CARGO_BIN_EXE_ccimport"))
        .arg("--rs_out")
        .arg(&rs_out)
        .arg("--cc_out")
        .arg(&cc_out)
        .arg("--public_headers")
        .arg("foo/bar.h")
        .arg("--targets_and_headers")
        .arg(r#"[{"t": "//foo:bar", "h": ["foo/bar.h"]}]"#)
        .arg("--do_nothing")
        .status()
        .expect("run ccimport");
    assert!(status.success());

    let sentinel = "// intentionally left empty because --do_nothing was passed.";
    assert_eq!(std::fs::read_to_string(&rs_out).expect("rs_out written"), sentinel);
    assert_eq!(std::fs::read_to_string(&cc_out).expect("cc_out written"), sentinel);
}

#[test]
fn missing_required_flags_fail() {
    let out = Command::new(env!("CARGO_BIN_EXE_ccimport"))
        .arg("--rs_out")
        .arg("/tmp/never-written.rs")
        .output()
        .expect("run ccimport");
    assert!(!out.status.success());
}

#[test]
fn mixed_target_headers_abort() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let rs_out = tmp.path().join("api.rs");
    let cc_out = tmp.path().join("api_impl.cc");

    let out = Command::new(env!("CARGO_BIN_EXE_ccimport"))
        .arg("--rs_out")
        .arg(&rs_out)
        .arg("--cc_out")
        .arg(&cc_out)
        .arg("--public_headers")
        .arg("foo/bar.h,foo/baz.h")
        .arg("--targets_and_headers")
        .arg(r#"[{"t": "//foo:bar", "h": ["foo/bar.h"]}, {"t": "//foo:baz", "h": ["foo/baz.h"]}]"#)
        .output()
        .expect("run ccimport");
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("foo/baz.h"), "stderr names the offending header: {stderr}");
    assert!(!rs_out.exists(), "no partial output is left behind");
}
