//! 配置管理命令
//!
//! 控制参数以 TOML 文件保存，见 [`ControlConfig`]。

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use ipbot_control::ControlConfig;
use std::path::{Path, PathBuf};

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 打印配置（未指定文件时打印默认值）
    Show {
        /// 配置文件路径
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// 加载并校验配置文件
    Check {
        /// 配置文件路径
        #[arg(short, long)]
        file: PathBuf,
    },

    /// 写出默认配置
    Init {
        /// 目标文件路径
        #[arg(short, long)]
        file: PathBuf,

        /// 覆盖已存在的文件
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub fn execute(self) -> Result<()> {
        match self {
            ConfigCommand::Show { file } => Self::show_(file.as_deref()),
            ConfigCommand::Check { file } => Self::check_(&file),
            ConfigCommand::Init { file, force } => Self::init_(&file, force),
        }
    }

    fn show_(file: Option<&Path>) -> Result<()> {
        let config = load_or_default(file)?;
        let content = config.to_toml_string().context("序列化配置失败")?;

        match file {
            Some(path) => println!("# {}", path.display()),
            None => println!("# 默认配置"),
        }
        print!("{}", content);
        Ok(())
    }

    fn check_(file: &Path) -> Result<()> {
        let config = load_config(file)?;

        println!("✅ 配置有效: {}", file.display());
        println!(
            "  PID: kp={} ki={} kd={}",
            config.pid.kp, config.pid.ki, config.pid.kd
        );
        match config.pid.integral_limit {
            Some(limit) => println!("  积分限幅: ±{}", limit),
            None => println!("  积分限幅: (未设置)"),
        }
        println!(
            "  恢复带: [{}, {}]  平衡带: [{}, {}]",
            config.safety.recover_band.min,
            config.safety.recover_band.max,
            config.safety.balance_band.min,
            config.safety.balance_band.max
        );
        println!("  控制周期: {} ms", config.cycle.period_ms);
        Ok(())
    }

    fn init_(file: &Path, force: bool) -> Result<()> {
        if file.exists() && !force {
            bail!("{} 已存在（使用 --force 覆盖）", file.display());
        }

        ControlConfig::default()
            .save(file)
            .with_context(|| format!("写入配置文件失败: {}", file.display()))?;

        println!("✅ 已写出默认配置: {}", file.display());
        Ok(())
    }
}

/// 加载配置文件
pub fn load_config(file: &Path) -> Result<ControlConfig> {
    ControlConfig::load(file).with_context(|| format!("加载配置文件失败: {}", file.display()))
}

/// 指定文件时加载，否则使用默认值
pub fn load_or_default(file: Option<&Path>) -> Result<ControlConfig> {
    match file {
        Some(path) => load_config(path),
        None => Ok(ControlConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_then_check() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ipbot.toml");

        ConfigCommand::Init {
            file: path.clone(),
            force: false,
        }
        .execute()
        .unwrap();
        assert!(path.exists());

        ConfigCommand::Check { file: path.clone() }.execute().unwrap();
        assert_eq!(load_config(&path).unwrap(), ControlConfig::default());
    }

    #[test]
    fn test_init_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ipbot.toml");
        std::fs::write(&path, "[cycle]\nperiod_ms = 20\n").unwrap();

        let result = ConfigCommand::Init {
            file: path.clone(),
            force: false,
        }
        .execute();
        assert!(result.is_err());
        assert_eq!(load_config(&path).unwrap().cycle.period_ms, 20);

        ConfigCommand::Init {
            file: path.clone(),
            force: true,
        }
        .execute()
        .unwrap();
        assert_eq!(load_config(&path).unwrap().cycle.period_ms, 10);
    }

    #[test]
    fn test_check_reports_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[pid]\nkp = \"fast\"\n").unwrap();

        let err = ConfigCommand::Check { file: path }.execute().unwrap_err();
        assert!(err.to_string().contains("加载配置文件失败"));
    }

    #[test]
    fn test_load_or_default_without_file() {
        assert_eq!(load_or_default(None).unwrap(), ControlConfig::default());
    }
}
