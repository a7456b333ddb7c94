#![warn(clippy::pedantic)]
#![warn(clippy::dbg_macro)]
#![deny(clippy::deref_by_slicing)]
#![warn(clippy::get_unwrap)]
#![warn(clippy::todo)]
#![warn(clippy::unimplemented)]
#![warn(clippy::unwrap_used)]

use chronotask::config::SchedulerConfig;
use chronotask::controller::Controller;
use chronotask::model::{TimeSlot, WorkingHours};
use chronotask::notifier::DesktopNotifier;
use chronotask::repository::RustbreakRepository;
use chronotask::smart_scheduler::SmartScheduler;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

mod cli;

#[derive(Parser)]
struct Args {
	#[arg(long, env = "CHRONOTASK_DB", default_value = "./chronotask.db")]
	pub db_path: PathBuf,
	#[arg(long, env = "CHRONOTASK_MAX_PER_DAY", default_value_t = 5)]
	pub max_per_day: u32,
}

fn weekday_hours(day: chrono::Weekday) -> WorkingHours {
	WorkingHours {
		day,
		start: chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
		end: chrono::NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
		allowed_slots: vec!["morning".into(), "afternoon".into()],
	}
}

fn default_working_hours() -> Vec<WorkingHours> {
	[
		chrono::Weekday::Mon,
		chrono::Weekday::Tue,
		chrono::Weekday::Wed,
		chrono::Weekday::Thu,
		chrono::Weekday::Fri,
	]
	.into_iter()
	.map(weekday_hours)
	.collect()
}

fn default_slot_pool() -> Vec<TimeSlot> {
	vec![
		TimeSlot {
			name: "morning".into(),
			start: chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
			end: chrono::NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
		},
		TimeSlot {
			name: "afternoon".into(),
			start: chrono::NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
			end: chrono::NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
		},
	]
}

fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.init();

	let Args { db_path, max_per_day } = Args::parse();

	let repo = Arc::new(RustbreakRepository::open(&db_path).expect("set up db"));
	let notifier = Arc::new(DesktopNotifier);
	let config = SchedulerConfig::new(default_working_hours(), default_slot_pool(), max_per_day);
	let scheduler = SmartScheduler::new(
		Arc::clone(&repo),
		notifier,
		config,
		|| chrono::Local::now().naive_local(),
	);
	let controller = Controller::new(repo, scheduler);
	controller.start();

	loop {
		match dialoguer::FuzzySelect::new()
			.items(&[
				"view tasks",
				"view scheduled occurrences",
				"add task",
				"remove task",
				"mark occurrence done",
				"retry occurrence",
				"run recovery sweep",
				"pause",
				"resume",
				"exit",
			])
			.interact()
			.expect("main menu")
		{
			0 => cli::list_tasks(&controller),
			1 => cli::list_scheduled(&controller),
			2 => cli::add_task(&controller),
			3 => cli::remove_task(&controller),
			4 => cli::mark_done(&controller),
			5 => cli::retry_occurrence(&controller),
			6 => cli::recover(&controller),
			7 => controller.pause(),
			8 => controller.resume(),
			9 => break,
			_ => unreachable!(),
		}
	}
	controller.pause();
}
