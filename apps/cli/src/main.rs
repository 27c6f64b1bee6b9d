//! # ipbot CLI
//!
//! 平衡控制器的命令行工具。
//!
//! ```bash
//! # 生成默认配置
//! ipbot-cli config init --file ipbot.toml
//!
//! # 校验配置
//! ipbot-cli config check --file ipbot.toml
//!
//! # 在模拟平台上闭环运行 2000 个周期，前进并左转
//! ipbot-cli simulate --cycles 2000 --file ipbot.toml --intent forward --offset 2
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{ConfigCommand, SimulateCommand};

/// ipbot CLI - 两轮自平衡控制器命令行工具
#[derive(Parser, Debug)]
#[command(name = "ipbot-cli")]
#[command(about = "Command-line interface for the ipbot balancing controller", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 控制参数管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 在模拟平台上闭环运行控制器
    Simulate {
        #[command(flatten)]
        args: SimulateCommand,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("ipbot_cli=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config(cmd) => cmd.execute(),
        Commands::Simulate { args } => args.execute(),
    }
}
