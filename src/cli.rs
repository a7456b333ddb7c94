//! The interactive front-end: a `dialoguer`-driven menu over the
//! [`Controller`] command surface, speaking tasks, occurrences, and
//! executions.
#![allow(clippy::unwrap_used)]

use chronotask::controller::Controller;
use chronotask::model::{Priority, RetryPolicy, TaskDefinition};
use chronotask::notifier::DesktopNotifier;
use chronotask::repository::RustbreakRepository;
use itertools::Itertools;
use uuid::Uuid;

type AppController = Controller<RustbreakRepository, DesktopNotifier>;

pub fn list_tasks(controller: &AppController) {
    let tasks = controller.list_tasks();
    if tasks.is_empty() {
        eprintln!("No tasks.");
        return;
    }
    for task in tasks.iter().sorted_by_key(|t| t.created_at) {
        println!(
            "{}\t{}\t{:?}\trecurrence={:?}\tretries={}",
            task.id, task.title, task.priority, task.recurrence, task.retry_policy.max_retries
        );
    }
}

pub fn list_scheduled(controller: &AppController) {
    let occurrences = controller.get_scheduled_occurrences();
    if occurrences.is_empty() {
        eprintln!("Nothing currently armed.");
        return;
    }
    for occ in occurrences.iter().sorted_by_key(|o| o.scheduled_for) {
        let task_title = controller
            .get_task(&occ.task_id)
            .map_or_else(|| "<unknown task>".to_string(), |t| t.title);
        println!(
            "{}\t{}\t{}",
            occ.scheduled_for,
            task_title,
            occ.slot_name.as_deref().unwrap_or("pinned")
        );
    }
}

pub fn add_task(controller: &AppController) {
    let title: String = dialoguer::Input::new()
        .with_prompt("Task title")
        .interact_text()
        .unwrap();
    let description: String = dialoguer::Input::new()
        .with_prompt("Description (blank for none)")
        .allow_empty(true)
        .interact_text()
        .unwrap();
    let recurrence_hours: String = dialoguer::Input::new()
        .with_prompt("Recurrence, in hours (blank for one-shot)")
        .allow_empty(true)
        .interact_text()
        .unwrap();
    let recurrence = recurrence_hours
        .trim()
        .parse::<f64>()
        .ok()
        .map(|hours| std::time::Duration::from_secs_f64(hours * 3600.0));
    let priority = match dialoguer::FuzzySelect::new()
        .items(&["low", "medium", "high"])
        .with_prompt("Priority")
        .interact()
        .unwrap()
    {
        0 => Priority::Low,
        1 => Priority::Medium,
        2 => Priority::High,
        _ => unreachable!(),
    };
    let max_retries: u32 = dialoguer::Input::new()
        .with_prompt("Max retries")
        .default(1)
        .interact()
        .unwrap();
    let pinned_raw: String = dialoguer::Input::new()
        .with_prompt("Pinned time, YYYY-MM-DDTHH:MM:SS (blank for none)")
        .allow_empty(true)
        .interact_text()
        .unwrap();
    let pinned_time = (!pinned_raw.trim().is_empty())
        .then(|| chrono::NaiveDateTime::parse_from_str(pinned_raw.trim(), "%Y-%m-%dT%H:%M:%S").ok())
        .flatten();

    let task = TaskDefinition {
        id: Uuid::new_v4().to_string(),
        title,
        description: (!description.is_empty()).then_some(description),
        link: None,
        created_at: chrono::Local::now().naive_local(),
        recurrence,
        priority,
        preferred_slots: vec![],
        retry_policy: RetryPolicy { max_retries },
        pinned_time,
    };
    eprintln!("{task:?}");
    if dialoguer::Confirm::new().with_prompt("OK?").interact().unwrap() {
        controller.add_task(task);
    }
}

pub fn remove_task(controller: &AppController) {
    let tasks = controller.list_tasks();
    if tasks.is_empty() {
        eprintln!("No tasks.");
        return;
    }
    if let Some(index) = dialoguer::FuzzySelect::new()
        .items(&tasks.iter().map(|t| &t.title).collect::<Vec<_>>())
        .with_prompt("Task to remove? (or esc)")
        .interact_opt()
        .unwrap()
    {
        controller
            .remove_task(&tasks[index].id)
            .expect("task exists, was just listed");
    }
}

pub fn mark_done(controller: &AppController) {
    let Some(occ_id) = select_occurrence(controller, "Occurrence to mark done? (or esc)") else {
        return;
    };
    if let Err(err) = controller.mark_done(&occ_id) {
        eprintln!("{err}");
    }
}

pub fn retry_occurrence(controller: &AppController) {
    let Some(occ_id) = select_occurrence(controller, "Occurrence to retry? (or esc)") else {
        return;
    };
    match controller.retry_occurrence(&occ_id) {
        Ok(Some(new_occ)) => eprintln!("Rescheduled for {}", new_occ.scheduled_for),
        Ok(None) => eprintln!("No retry slot available."),
        Err(err) => eprintln!("{err}"),
    }
}

pub fn recover(controller: &AppController) {
    controller.recover_missed_tasks();
    eprintln!("Recovery sweep complete.");
}

fn select_occurrence(controller: &AppController, prompt: &str) -> Option<String> {
    let occurrences = controller.get_scheduled_occurrences();
    if occurrences.is_empty() {
        eprintln!("Nothing currently armed.");
        return None;
    }
    let labels: Vec<String> = occurrences
        .iter()
        .map(|o| {
            let title = controller
                .get_task(&o.task_id)
                .map_or_else(|| "<unknown task>".to_string(), |t| t.title);
            format!("{} @ {}", title, o.scheduled_for)
        })
        .collect();
    let index = dialoguer::FuzzySelect::new()
        .items(&labels)
        .with_prompt(prompt)
        .interact_opt()
        .unwrap()?;
    Some(occurrences[index].id.clone())
}
