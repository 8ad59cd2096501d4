use std::process::Command;

fn main() {
    let commit = run("git", &["rev-parse", "--short", "HEAD"]);
    // 构建时间（UTC），不为此引入时间库
    let build_time = run("date", &["-u", "+%Y-%m-%dT%H:%M:%SZ"]);
    let target = std::env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=TEMPORIZE_GIT_COMMIT={commit}");
    println!("cargo:rustc-env=TEMPORIZE_BUILD_TIME={build_time}");
    println!("cargo:rustc-env=TEMPORIZE_BUILD_TARGET={target}");
    println!("cargo:rustc-env=TEMPORIZE_BUILD_PROFILE={profile}");

    // 仅在 git HEAD 变化时重新运行
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
}

/// 执行外部命令并取其输出，失败时返回 "unknown"
fn run(program: &str, args: &[&str]) -> String {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
