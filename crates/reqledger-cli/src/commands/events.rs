use crate::support::{Settings, exit_with_error, print_json_or_exit};
use reqledger_ledger::{EventLogError, EventRecord, read_event_log_from_path};

pub fn run(name: Option<String>, json_output: bool, settings: &Settings) {
    let records = match read_event_log_from_path(&settings.events_path) {
        Ok(records) => records,
        Err(EventLogError::Missing(_)) => Vec::new(),
        Err(e) => exit_with_error(format!(
            "failed to read event log {}: {e}",
            settings.events_path.display()
        )),
    };
    let records: Vec<EventRecord> = records
        .into_iter()
        .filter(|record| name.as_deref().is_none_or(|wanted| record.name == wanted))
        .collect();

    if json_output {
        print_json_or_exit(&records);
        return;
    }

    println!("reqledger events ({})", records.len());
    for record in &records {
        println!("  #{} {} {}", record.seq, record.name, record.payload);
    }
}
