use component_install::config::Config;
use component_install::package::{
    install_tree, InstallEvent, InstallReporter, InstallTask, Installer, TreeSummary,
};
use component_core::ComponentResult;
use futures_util::future::join_all;
use std::path::PathBuf;
use std::sync::Arc;

pub struct InstallOptions {
    pub packages: Vec<String>,
    pub dir: Option<PathBuf>,
    pub concurrency: Option<usize>,
    pub token: Option<String>,
}

/// Prints one line per lifecycle event of every task in the tree.
pub struct ConsoleReporter;

impl InstallReporter for ConsoleReporter {
    fn on_start(&self, task: &InstallTask) {
        println!("  {} : downloading", task.name());
    }

    fn on_event(&self, task: &InstallTask, event: &InstallEvent) {
        match event {
            InstallEvent::Resolved(release) => println!(
                "  {} : resolve {} -> {}",
                task.name(),
                task.version_range(),
                release
            ),
            InstallEvent::File(file) => println!("  {} : GET {}", task.name(), file),
            InstallEvent::Error(err) => println!("  {} : error {}", task.name(), err),
            InstallEvent::End(_) => {}
        }
    }

    fn on_dependencies(&self, task: &InstallTask, count: usize) {
        println!("  {} : installing {} dependencies", task.name(), count);
    }

    fn on_installed(&self, task: &InstallTask) {
        println!("  {} : installed", task.name());
    }
}

/// Split `name@range` into its parts; the range defaults to `*`.
pub fn parse_package_spec(spec: &str) -> (String, String) {
    match spec.split_once('@') {
        Some((name, range)) if !range.is_empty() => (name.to_string(), range.to_string()),
        Some((name, _)) => (name.to_string(), "*".to_string()),
        None => (spec.to_string(), "*".to_string()),
    }
}

pub async fn run(options: InstallOptions) -> ComponentResult<TreeSummary> {
    let mut config = Config::load().unwrap_or_default();
    if let Some(dir) = options.dir {
        config.destination_root = dir;
    }
    if let Some(concurrency) = options.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(token) = options.token {
        config.github.token = Some(token);
    }

    let installer = Installer::new(&config)?;
    let reporter: Arc<dyn InstallReporter> = Arc::new(ConsoleReporter);

    let trees = options.packages.iter().map(|spec| {
        let (name, range) = parse_package_spec(spec);
        let installer = installer.clone();
        let reporter = Arc::clone(&reporter);
        async move { install_tree(&installer, &name, &range, reporter).await }
    });

    let summary = join_all(trees)
        .await
        .into_iter()
        .fold(TreeSummary::default(), |total, tree| TreeSummary {
            installed: total.installed + tree.installed,
            failed: total.failed + tree.failed,
        });

    Ok(summary)
}
