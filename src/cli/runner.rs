//! Top-level run: configuration, login, transfers and the final summary

use crate::cli::args::Args;
use crate::config::MirrorConfig;
use crate::error::Result;
use crate::logging::Logger;
use crate::mirror::{Executor, ListOrigin, MirrorReport, TransferEntry};
use crate::registry::{ContainerEngine, DockerEngine, Session};

pub struct Runner {
    args: Args,
    logger: Logger,
}

impl Runner {
    pub fn new(args: Args) -> Self {
        let logger = if args.quiet {
            Logger::new_quiet()
        } else {
            Logger::new(args.verbose)
        };

        Self { args, logger }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub async fn run(&self) -> Result<()> {
        self.logger.section("Image Mirror");

        let config = MirrorConfig::from_args(&self.args)?;
        let entries = config.entries()?;
        self.report_plan(&config, &entries);

        if entries.is_empty() {
            self.logger.info("Nothing to mirror");
            return Ok(());
        }
        if config.dry_run {
            self.logger.info("Dry run mode - skipping login and transfers");
            return Ok(());
        }

        let engine = DockerEngine::connect(&config.registry, self.logger.clone())?;
        self.mirror(engine, &config, &entries).await?;
        Ok(())
    }

    /// Log in through `engine` and transfer `entries` in order
    pub async fn mirror<E: ContainerEngine>(
        &self,
        engine: E,
        config: &MirrorConfig,
        entries: &[TransferEntry],
    ) -> Result<MirrorReport> {
        self.logger.subsection("Registry login");
        let session = Session::establish(engine, config.auth.clone(), &self.logger).await?;

        let report = Executor::new(&session, &self.logger).run(entries).await?;

        let mirrored: Vec<String> = report.mirrored.iter().map(ToString::to_string).collect();
        self.logger.list("Mirrored images", &mirrored);
        self.logger.success(&format!(
            "Mirrored {} image(s) in {}",
            report.mirrored.len(),
            self.logger.format_duration(report.elapsed)
        ));
        Ok(report)
    }

    fn report_plan(&self, config: &MirrorConfig, entries: &[TransferEntry]) {
        let origin = match &config.origin {
            ListOrigin::Mapping(path) => format!("{} (mapping)", path.display()),
            ListOrigin::Plain(path) => format!("{} (list)", path.display()),
            ListOrigin::Empty => "none".to_string(),
        };
        if config.origin == ListOrigin::Empty {
            self.logger.warning(&format!(
                "Neither {} nor {} exists, no images configured",
                self.args.mapping_file.display(),
                self.args.images_file.display()
            ));
        }

        let mut items = vec![
            ("Image list", origin),
            ("Registry", display_or(&config.registry.address, "docker.io")),
            ("Namespace", display_or(&config.registry.namespace, "-")),
        ];
        if let Some(run_id) = &config.github.run_id {
            items.push(("Run id", run_id.clone()));
        }
        if let (Some(user), Some(repo)) = (&config.github.user, &config.github.repo) {
            items.push(("Repository", format!("{}/{}", user, repo)));
        }
        self.logger.summary_kv("Configuration", &items);

        let planned: Vec<String> = entries.iter().map(ToString::to_string).collect();
        self.logger.list("Planned transfers", &planned);
        tracing::debug!(?config, "configuration loaded");
    }
}

fn display_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}
