//! Install root preparation and source builds
//!
//! An existing install root is never repaired: it is either wiped and rebuilt
//! or left untouched and the run stops.

use crate::install::error::{Flow, InstallError, IoSnafu, StageResult};
use crate::install::prompt::{Prompter, Question};
use crate::install::runner::{Step, StepRunner};
use snafu::ResultExt;
use std::fs;
use std::path::Path;
use zond_setup_lib::InstallerConfig;

/// Create the install root, asking before wiping an existing one
pub fn prepare_install_dir(root: &Path, prompter: &mut dyn Prompter) -> StageResult {
    if root.exists() {
        let question = Question::ReplaceInstallDir {
            path: root.to_path_buf(),
        };
        let replace = prompter.confirm(&question).context(IoSnafu {
            action: "read answer",
        })?;

        if !replace {
            println!("👋 Keeping existing installation at {}", root.display());
            return Ok(Flow::Halt);
        }

        println!("🗑️  Removing {}", root.display());
        fs::remove_dir_all(root).with_context(|_| IoSnafu {
            action: format!("remove {}", root.display()),
        })?;
    }

    fs::create_dir_all(root).with_context(|_| IoSnafu {
        action: format!("create {}", root.display()),
    })?;
    Ok(Flow::Continue)
}

fn clone_step(url: &str, dir: &str, depth: u32, root: &Path) -> Step {
    Step::new(
        format!("Cloning {dir}"),
        format!("git clone --depth {depth} {url} {dir}"),
    )
    .in_dir(root)
}

/// Every step of the build, in order, without running anything
pub fn build_steps(config: &InstallerConfig, root: &Path) -> Vec<Step> {
    let src = &config.sources;
    let mut steps = vec![
        clone_step(&src.execution_repo, &src.execution_dir, src.clone_depth, root),
        clone_step(&src.consensus_repo, &src.consensus_dir, src.clone_depth, root),
        Step::new(
            format!("Building {}", src.execution_binaries.join(", ")),
            src.execution_build.clone(),
        )
        .in_dir(root.join(&src.execution_dir)),
    ];

    let consensus_root = root.join(&src.consensus_dir);
    steps.extend(src.consensus_binaries.iter().map(|name| {
        Step::new(
            format!("Building {name}"),
            format!("go build -o={} ./cmd/{name}", root.join(name).display()),
        )
        .in_dir(&consensus_root)
    }));

    steps
}

/// Copy the execution client binaries out of its build directory into the root
pub fn copy_execution_binaries(config: &InstallerConfig, root: &Path) -> Result<(), InstallError> {
    let src = &config.sources;
    let output = root.join(&src.execution_dir).join(&src.execution_output);

    for name in &src.execution_binaries {
        let from = output.join(name);
        let to = root.join(name);
        // fs::copy carries the permission bits across
        fs::copy(&from, &to).with_context(|_| IoSnafu {
            action: format!("copy {} to {}", from.display(), to.display()),
        })?;
    }

    println!("✅ Copied {} into {}", src.execution_binaries.join(", "), root.display());
    Ok(())
}

/// Sources stage: clone, build, and collect binaries at the install root
pub fn build_sources(runner: &StepRunner, config: &InstallerConfig, root: &Path) -> StageResult {
    let steps = build_steps(config, root);
    // Execution client binaries must be copied out before the consensus builds
    let (execution, consensus) = steps.split_at(3);

    for step in execution {
        runner.run(step)?;
    }
    copy_execution_binaries(config, root)?;

    for step in consensus {
        runner.run(step)?;
    }

    Ok(Flow::Continue)
}
