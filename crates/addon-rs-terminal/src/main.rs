use std::collections::HashMap;
use std::path::{Path, PathBuf};

use addon_rs::installer::*;
use addon_rs::relationship_resolver::{self, AddonMetadata, DependencyGraph, ResolverKind};

const BRIEF: &str = "Usage: addon-rs-terminal (resolve|install|uninstall) PLAN [options]";

#[tokio::main]
async fn main() {
	env_logger::init();

	let mut opts;

	/* Parse console input */
	let parsed_options = {
		opts = getopts::Options::new();
		opts.optflag( "h", "help",             "Show help");
		opts.optflag( "v", "verbose",          "Print every action as it runs");
		opts.optopt(  "s", "strategy",         "Resolver strategy, depth-first or breadth-first", "KIND");
		opts.optflag( "r", "rename-conflicts", "Install next to existing files instead of failing");
		opts.parsing_style(getopts::ParsingStyle::FloatingFrees);

		let parsed_options = match opts.parse(std::env::args().skip(1)) {
			Ok(m)  => { m }
			Err(e) => { println!("Unable to parse options: {}", e); return }
		};

		if parsed_options.opt_present("h") {
			eprintln!("{}", opts.usage(BRIEF));
			return;
		}

		parsed_options
	};

	let config = addon_rs::Config::load_from_disk().unwrap_or_else(|e| {
		log::warn!("Failed to read config file: {}", e);
		log::warn!("Using default config.");
		addon_rs::Config::default()
	});

	let kind = match parsed_options.opt_str("s") {
		Some(s) => match s.parse::<ResolverKind>() {
			Ok(kind) => kind,
			Err(e) => { log::error!("{}", e); return },
		},
		None => config.resolver_kind(),
	};
	let verbose = parsed_options.opt_present("v");

	let (command, plan_path) = match (parsed_options.free.first(), parsed_options.free.get(1)) {
		(Some(command), Some(path)) => (command.as_str(), PathBuf::from(path)),
		_ => { eprintln!("{}", opts.usage(BRIEF)); return },
	};

	let plan = match PlanFile::load(&plan_path) {
		Ok(plan) => plan,
		Err(e) => { log::error!("Failed to read plan {}: {}", plan_path.display(), e); return },
	};

	let result = match command {
		"resolve" => print_order(&plan, kind),
		"install" => install(&config, &plan, kind, parsed_options.opt_present("r"), verbose).await,
		"uninstall" => uninstall(&config, &plan, kind, verbose).await,
		_ => { log::error!("Unknown command \"{}\".", command); return },
	};

	if let Err(e) = result {
		log::error!("{}", e);
		std::process::exit(1);
	}
}

/// The add-ons to operate on and where their files go.
///
/// Relative sources are taken from the plan's directory, relative destinations from `root`.
#[derive(Debug, serde::Deserialize)]
struct PlanFile {
	root: PathBuf,
	addons: Vec<PlannedAddon>,
	#[serde(skip)]
	base_dir: PathBuf,
}

#[derive(Debug, serde::Deserialize)]
struct PlannedAddon {
	#[serde(flatten)]
	metadata: AddonMetadata,
	#[serde(default)]
	files: Vec<RequestEntry>,
}

impl PlanFile {
	fn load(path: &Path) -> Result<Self, Error> {
		let file = std::fs::File::open(path)?;
		let mut plan: PlanFile = serde_json::from_reader(std::io::BufReader::new(file))?;
		plan.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
		Ok(plan)
	}

	fn resolve(&self, kind: ResolverKind) -> Result<Vec<String>, Error> {
		let graph = DependencyGraph::from_metadata(self.addons.iter().map(|a| &a.metadata)).map_err(addon_rs::Error::from)?;
		Ok(relationship_resolver::resolve(&graph, kind).map_err(addon_rs::Error::from)?)
	}

	fn install_requests(&self) -> HashMap<String, InstallRequest> {
		self.addons.iter()
			.map(|a| {
				let entries = a.files.iter().map(|e| e.clone().rooted(&self.base_dir, &self.root)).collect();
				(a.metadata.name.clone(), InstallRequest::new(entries))
			})
			.collect()
	}
}

fn print_order(plan: &PlanFile, kind: ResolverKind) -> Result<(), Error> {
	let order = plan.resolve(kind)?;
	println!("Install order ({}):", kind);
	for (i, name) in order.iter().enumerate() {
		println!("{}) {}", i + 1, name);
	}
	Ok(())
}

async fn install(config: &addon_rs::Config, plan: &PlanFile, kind: ResolverKind, rename_conflicts: bool, verbose: bool) -> Result<(), Error> {
	let order = plan.resolve(kind)?;

	let rules = RuleSet::new().with(Rule::ConfineTo(plan.root.clone()));
	let rules = if rename_conflicts {
		rules.with(Rule::RenameOnConflict { suffix: config.conflict_suffix().to_owned() })
	} else {
		rules.with(Rule::RejectExisting)
	};

	let actions = addon_rs::installer::plan::build_install_actions(&order, &plan.install_requests(), &rules, &CustomSteps::new())?;
	println!("Installing {} files for {} add-ons.", actions.len(), order.len());

	let queue = InstallerQueue::new(actions, config.queue_options()).map_err(addon_rs::Error::from)?;
	let result = run_queue(queue, verbose).await?;
	report(&result)
}

/// Removes the files an install of the same plan puts in place, dependents first.
///
/// Directory entries are listed from the staged sources so those need to still be around.
async fn uninstall(config: &addon_rs::Config, plan: &PlanFile, kind: ResolverKind, verbose: bool) -> Result<(), Error> {
	let order = plan.resolve(kind)?;
	let steps = CustomSteps::new();

	let mut requests = HashMap::<String, UninstallRequest>::new();
	for (name, request) in plan.install_requests() {
		let copies = InstallRequest::new(request.entries.into_iter().filter(|e| e.kind == EntryKind::Copy).collect());
		let mut installed = Vec::<PathBuf>::new();
		for action in copies.into_actions(&steps).map_err(addon_rs::Error::from)? {
			if let InstallerAction::InstallFile(file) = action {
				if file.destination.exists() {
					installed.push(file.destination);
				} else {
					log::warn!("{} is not installed, skipping", file.destination.display());
				}
			}
		}
		requests.insert(name, UninstallRequest::from_installed(installed));
	}

	let rules = RuleSet::new().with(Rule::ConfineTo(plan.root.clone()));
	let actions = addon_rs::installer::plan::build_uninstall_actions(&relationship_resolver::removal_order(&order), &requests, &rules, &steps)?;
	println!("Removing {} files for {} add-ons.", actions.len(), order.len());

	let queue = InstallerQueue::new(actions, config.queue_options()).map_err(addon_rs::Error::from)?;
	let result = run_queue(queue, verbose).await?;
	report(&result)
}

/// Runs the queue off the main thread, Ctrl-C stops it before the next action.
async fn run_queue(queue: InstallerQueue, verbose: bool) -> Result<RunResult, Error> {
	let descriptions: Vec<String> = queue.actions().iter().map(ToString::to_string).collect();
	let cancel = CancelToken::new();
	let (handle, mut progress) = worker::spawn_run(queue, cancel.clone());

	let ctrl_c = tokio::signal::ctrl_c();
	tokio::pin!(ctrl_c);

	loop {
		tokio::select! {
			event = progress.recv() => match event {
				Some(event) => print_progress(&event, &descriptions, verbose),
				None => break,
			},
			_ = &mut ctrl_c, if !cancel.is_cancelled() => {
				println!("Cancelling after the current action...");
				cancel.cancel();
			},
		}
	}

	Ok(handle.await?)
}

fn print_progress(event: &ProgressEvent, descriptions: &[String], verbose: bool) {
	let description = descriptions.get(event.action_index).map(String::as_str).unwrap_or_default();
	match event.outcome {
		ProgressOutcome::Executed if verbose => println!("[{}/{}] {}", event.action_index + 1, event.total_actions, description),
		ProgressOutcome::Executed => {},
		ProgressOutcome::Failed => println!("[{}/{}] FAILED {}", event.action_index + 1, event.total_actions, description),
	}
}

fn report(result: &RunResult) -> Result<(), Error> {
	for (index, e) in result.rollback_failures() {
		println!("Could not undo {}: {}", result.outcomes[index].description, e);
	}
	for (index, e) in &result.cleanup_failures {
		log::warn!("Leftover from {}: {}", result.outcomes[*index].description, e);
	}

	match result.status {
		RunStatus::Completed => {
			println!("Done, {} actions applied.", result.outcomes.len());
			Ok(())
		},
		RunStatus::Failed { index } => {
			if let Some((_, e)) = result.failed_action() {
				println!("{} failed: {}", result.outcomes[index].description, e);
			}
			println!("Rolled back {} actions.", result.rolled_back.len());
			Err(Error::RunFailed)
		},
		RunStatus::Cancelled { .. } => {
			println!("Cancelled, rolled back {} actions.", result.rolled_back.len());
			Err(Error::UserCancelled)
		},
	}
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("addon-rs error: {0}")]
	AddonRsError(#[from] addon_rs::Error),
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
	#[error("Plan file error: {0}")]
	Plan(#[from] serde_json::Error),
	#[error("Worker error: {0}")]
	Worker(#[from] tokio::task::JoinError),
	#[error("Run failed and was rolled back")]
	RunFailed,
	#[error("User cancelled an action")]
	UserCancelled,
}
