use clap::{Parser, Subcommand};
use std::path::PathBuf;
use temporize::compiler::{lexer, parser};
use temporize::{build, check, config};

#[derive(Parser)]
#[command(name = "temporize", about = "模板 DSL → Rust 源码编译器", version = long_version())]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// 编译所有模板并写入输出目录
    Build {
        /// 先删除所有生成文件再全量写入
        #[arg(long)]
        clean: bool,

        /// 内容未变化的文件也重新写入
        #[arg(long)]
        force: bool,

        /// 项目根目录（默认当前目录）
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// 模板目录（覆盖 temporize.toml）
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// 输出目录（覆盖 temporize.toml）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 编译并校验所有模板，不写入文件
    Check {
        /// 项目根目录（默认当前目录）
        #[arg(short, long, default_value = ".")]
        root: PathBuf,
    },

    /// 打印单个模板的 AST（或 token 序列）
    Inspect {
        /// 模板文件
        file: PathBuf,

        /// 打印 token 而不是 AST
        #[arg(long)]
        tokens: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // None 等同于在当前目录执行 build
    let command = cli.command.unwrap_or(Commands::Build {
        clean: false,
        force: false,
        root: PathBuf::from("."),
        input: None,
        output: None,
    });

    // 对于需要加载配置的命令，使用配置中的日志级别作为默认值
    let default_level = match &command {
        Commands::Build { root, .. } | Commands::Check { root } => {
            config::ProjectConfig::load(&root.canonicalize().unwrap_or_else(|_| root.clone()))
                .ok()
                .map(|c| c.build.log_level.clone())
        }
        Commands::Inspect { .. } => None,
    };

    let default_level = default_level.as_deref().unwrap_or("info");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    match command {
        Commands::Build {
            clean,
            force,
            root,
            input,
            output,
        } => {
            let root = root.canonicalize()?;
            let project_config = config::ProjectConfig::load(&root)?;
            let _stats = build::run(
                &root,
                &project_config,
                build::BuildParams {
                    clean,
                    force,
                    input_dir: input,
                    output_dir: output,
                },
            )?;
        }
        Commands::Check { root } => {
            let root = root.canonicalize()?;
            let result = check::run(&root)?;

            for w in &result.warnings {
                tracing::warn!("{w}");
            }
            for e in &result.errors {
                tracing::error!("{e}");
            }

            if result.errors.is_empty() {
                tracing::info!("检查通过（{} 个警告）", result.warnings.len());
            } else {
                anyhow::bail!(
                    "检查未通过：{} 个错误，{} 个警告",
                    result.errors.len(),
                    result.warnings.len()
                );
            }
        }
        Commands::Inspect { file, tokens } => {
            let source = std::fs::read_to_string(&file)?;
            let source_id = file.display().to_string();
            let parsed = lexer::tokenize_str(&source_id, &source)?;
            if tokens {
                for token in parsed.tokens() {
                    println!("{token}");
                }
            } else {
                let ast = parser::build(parsed.tokens())?;
                print!("{ast}");
            }
            println!("sha256: {}", parsed.hash_hex());
        }
    }

    Ok(())
}

const fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        "\ncommit:  ",
        env!("TEMPORIZE_GIT_COMMIT"),
        "\nbuild:   ",
        env!("TEMPORIZE_BUILD_TIME"),
        "\ntarget:  ",
        env!("TEMPORIZE_BUILD_TARGET"),
        "\nprofile: ",
        env!("TEMPORIZE_BUILD_PROFILE"),
    )
}
