use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use openehr::flat::{DEFAULT_LANGUAGE, DEFAULT_TERRITORY};
use openehr::{
    archetype_info, parse_timestamp, reconstruct, select_vital_signs_query, FlatCompositionBuilder,
    QueryResult, VitalSignsRecord,
};
use serde_json::json;
use std::path::PathBuf;
use vitals_types::{EhrId, PatientId};

#[derive(Parser)]
#[command(name = "vitals")]
#[command(about = "Offline inspection of the vital-signs openEHR mapping")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the FLAT composition built for a reading
    Compose {
        /// Patient ID
        #[arg(long)]
        patient: String,
        /// Recording time (RFC 3339; no offset means UTC)
        #[arg(long, value_parser = parse_instant)]
        recorded_at: DateTime<Utc>,
        /// Systolic pressure, mmHg
        #[arg(long)]
        systolic: Option<u16>,
        /// Diastolic pressure, mmHg
        #[arg(long)]
        diastolic: Option<u16>,
        /// Pulse rate, beats per minute
        #[arg(long)]
        pulse_rate: Option<u16>,
        /// Composition language
        #[arg(long, default_value = DEFAULT_LANGUAGE)]
        language: String,
        /// Composition territory
        #[arg(long, default_value = DEFAULT_TERRITORY)]
        territory: String,
    },
    /// Print the AQL query and parameters selected for an EHR
    Query {
        /// EHR ID
        #[arg(long)]
        ehr_id: String,
        /// Start of the recording-time window (RFC 3339)
        #[arg(long, value_parser = parse_instant)]
        from: Option<DateTime<Utc>>,
        /// End of the recording-time window (RFC 3339)
        #[arg(long, value_parser = parse_instant)]
        to: Option<DateTime<Utc>>,
    },
    /// Reconstruct records from a saved AQL result set (JSON)
    Reconstruct {
        /// Path to the saved result set
        file: PathBuf,
        /// Patient ID the rows belong to
        #[arg(long)]
        patient: String,
        #[arg(long, default_value_t = 0)]
        skip: usize,
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
    /// Describe an archetype
    Archetype {
        /// Archetype id, e.g. openEHR-EHR-OBSERVATION.blood_pressure.v1
        archetype_id: String,
    },
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    parse_timestamp(raw).ok_or_else(|| format!("invalid timestamp '{raw}', expected RFC 3339"))
}

fn print_json(value: &impl serde::Serialize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Compose {
            patient,
            recorded_at,
            systolic,
            diastolic,
            pulse_rate,
            language,
            territory,
        }) => {
            let record = VitalSignsRecord::new(
                PatientId::new(patient)?,
                None,
                recorded_at,
                systolic,
                diastolic,
                pulse_rate,
            )?;
            let composition = FlatCompositionBuilder::new(language, territory).build(&record);
            print_json(&composition)?;
        }
        Some(Commands::Query { ehr_id, from, to }) => {
            let query = select_vital_signs_query(&EhrId::new(ehr_id)?, from, to);
            print_json(&query)?;
        }
        Some(Commands::Reconstruct {
            file,
            patient,
            skip,
            limit,
        }) => {
            let contents = std::fs::read_to_string(&file)?;
            let result = QueryResult::from_json_str(&contents)?;
            let page = reconstruct(&result, &PatientId::new(patient)?, skip, limit);
            let items: Vec<_> = page
                .items
                .iter()
                .map(|stored| {
                    json!({
                        "composition_uid": stored.composition_uid,
                        "record": stored.record,
                    })
                })
                .collect();
            print_json(&json!({ "items": items, "total": page.total }))?;
        }
        Some(Commands::Archetype { archetype_id }) => {
            print_json(&archetype_info::lookup(&archetype_id)?)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_arguments_parse() {
        let cli = Cli::try_parse_from([
            "vitals",
            "compose",
            "--patient",
            "P1",
            "--recorded-at",
            "2024-01-01T10:00:00Z",
            "--systolic",
            "120",
            "--diastolic",
            "80",
        ])
        .expect("compose arguments should parse");

        match cli.command {
            Some(Commands::Compose {
                systolic,
                pulse_rate,
                language,
                ..
            }) => {
                assert_eq!(systolic, Some(120));
                assert_eq!(pulse_rate, None);
                assert_eq!(language, "en");
            }
            _ => panic!("expected compose command"),
        }
    }

    #[test]
    fn test_query_window_without_offset_is_utc() {
        let cli = Cli::try_parse_from([
            "vitals",
            "query",
            "--ehr-id",
            "e1",
            "--from",
            "2024-01-01T00:00:00",
        ])
        .expect("naive timestamp should parse");
        match cli.command {
            Some(Commands::Query { from, .. }) => {
                assert_eq!(from, parse_timestamp("2024-01-01T00:00:00Z"));
            }
            _ => panic!("expected query command"),
        }
    }

    #[test]
    fn test_reconstruct_defaults() {
        let cli = Cli::try_parse_from(["vitals", "reconstruct", "rows.json", "--patient", "P1"])
            .expect("reconstruct arguments should parse");
        match cli.command {
            Some(Commands::Reconstruct { skip, limit, .. }) => {
                assert_eq!(skip, 0);
                assert_eq!(limit, 100);
            }
            _ => panic!("expected reconstruct command"),
        }
    }

    #[test]
    fn test_bad_timestamp_is_rejected() {
        assert!(Cli::try_parse_from([
            "vitals",
            "query",
            "--ehr-id",
            "e1",
            "--from",
            "last tuesday"
        ])
        .is_err());
    }
}
