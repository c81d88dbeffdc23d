use std::path::PathBuf;
use std::process::Output;

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_vidcat")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "vidcat.exe"
            } else {
                "vidcat"
            });
            p
        })
}

fn run(args: &[&str]) -> Output {
    std::process::Command::new(exe())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

#[test]
fn cli_rejects_missing_video() {
    let out = run(&["definitely/missing/clip.mp4"]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("video file not found"), "{stderr}");
}

#[test]
fn cli_rejects_non_positive_width() {
    for width in ["0", "-5"] {
        let out = run(&["clip.mp4", "--width", width]);
        assert!(!out.status.success());
        let stderr = String::from_utf8_lossy(&out.stderr);
        assert!(stderr.contains("invalid width"), "{stderr}");
    }
}

#[test]
fn cli_rejects_out_of_range_level() {
    let out = run(&["clip.mp4", "--level", "42"]);
    assert!(!out.status.success());
}

#[test]
fn cli_refuses_to_overwrite_input() {
    let dir = std::env::temp_dir().join(format!("vidcat_cli_smoke_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let video = dir.join("clip.zst");
    std::fs::write(&video, b"not really a video").unwrap();

    let arg = video.to_string_lossy().to_string();
    let out = run(&[arg.as_str()]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("would overwrite the input"));
    assert_eq!(std::fs::read(&video).unwrap(), b"not really a video");

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn cli_refuses_output_that_aliases_input() {
    let dir = std::env::temp_dir().join(format!("vidcat_cli_alias_{}", std::process::id()));
    std::fs::create_dir_all(dir.join("sub")).unwrap();
    let video = dir.join("clip.mp4");
    std::fs::write(&video, b"not really a video").unwrap();

    let aliases = [
        dir.join("sub").join("..").join("clip.mp4"),
        dir.join("missing").join("..").join("clip.mp4"),
        dir.join(".").join("clip.mp4"),
    ];
    let video_arg = video.to_string_lossy().to_string();
    for alias in aliases {
        let alias_arg = alias.to_string_lossy().to_string();
        let out = run(&[video_arg.as_str(), "--output", alias_arg.as_str()]);
        assert!(!out.status.success());
        let stderr = String::from_utf8_lossy(&out.stderr);
        assert!(stderr.contains("would overwrite the input"), "{stderr}");
    }
    assert_eq!(std::fs::read(&video).unwrap(), b"not really a video");

    std::fs::remove_dir_all(&dir).ok();
}
