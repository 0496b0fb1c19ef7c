use std::path::PathBuf;

use clap::{Parser, Subcommand};

use cwas_rsfmri::design::DesignConfig;
use cwas_rsfmri::glm::GlmConfig;
use cwas_rsfmri::logging::init_tracing;
use cwas_rsfmri::phenotype::{PhenotypeConfig, SexEncoding};
use cwas_rsfmri::workflow::{RunConfig, run_pipeline};

#[derive(Parser)]
#[command(name = "cwas")]
#[command(about = "Connectome-wide association study for resting-state fMRI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a full CWAS over a derivatives directory.
    Run {
        #[arg(long, required = true)]
        bids_dir: PathBuf,
        #[arg(long, required = true)]
        output_dir: PathBuf,
        #[arg(long, required = true)]
        phenotype_file: PathBuf,
        /// Atlas name used in output file naming.
        #[arg(long, required = true)]
        atlas: String,
        #[arg(long, required = true)]
        atlas_file: PathBuf,
        /// Feature label used in output file naming.
        #[arg(long, required = true)]
        feature: String,
        /// Per-subject connectivity path template relative to the BIDS
        /// directory, with `{participant}` insertion points.
        #[arg(long, required = true)]
        connectome_template: String,
        /// Per-subject confounds JSON template; omit if the phenotype file
        /// already carries a mean_fd column.
        #[arg(long)]
        confounds_template: Option<String>,
        /// Visual-QC ratings JSON.
        #[arg(long)]
        ratings_file: Option<PathBuf>,
        #[arg(long, default_value_t = 0.5)]
        fd_threshold: f64,

        /// Phenotype column holding the group contrast.
        #[arg(long, default_value = "diagnosis")]
        group: String,
        #[arg(long, required = true)]
        case_id: String,
        #[arg(long, required = true)]
        control_id: String,
        #[arg(long, default_value = "participant_id")]
        subject_col: String,
        #[arg(long, default_value = "age")]
        age_col: String,
        #[arg(long, default_value = "sex")]
        sex_col: String,
        /// Sex label encoded as 0.
        #[arg(long, required = true)]
        sex_zero: String,
        /// Sex label encoded as 1.
        #[arg(long, required = true)]
        sex_one: String,
        /// Phenotype column with scanner identifiers; including it adds the
        /// covariate to the model.
        #[arg(long)]
        scanner_col: Option<String>,
        #[arg(long)]
        sequence_col: Option<String>,
        #[arg(long)]
        medication_col: Option<String>,

        #[arg(long, default_value_t = 0.05)]
        alpha: f64,
        #[arg(long)]
        parallel: bool,
        #[arg(long)]
        cores: Option<usize>,
    },
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            bids_dir,
            output_dir,
            phenotype_file,
            atlas,
            atlas_file,
            feature,
            connectome_template,
            confounds_template,
            ratings_file,
            fd_threshold,
            group,
            case_id,
            control_id,
            subject_col,
            age_col,
            sex_col,
            sex_zero,
            sex_one,
            scanner_col,
            sequence_col,
            medication_col,
            alpha,
            parallel,
            cores,
        } => {
            let config = RunConfig {
                bids_dir,
                out_dir: output_dir,
                phenotype: PhenotypeConfig {
                    path: phenotype_file,
                    subject_col,
                    diagnosis_col: group.clone(),
                    age_col,
                    sex_col,
                    scanner_col: scanner_col.clone(),
                    sequence_col: sequence_col.clone(),
                    medication_col: medication_col.clone(),
                    case_label: case_id,
                    control_label: control_id.clone(),
                    sex_encoding: SexEncoding {
                        zero: sex_zero,
                        one: sex_one,
                    },
                },
                atlas_file,
                atlas_name: atlas,
                feature,
                connectome_template,
                confounds_template,
                ratings_file,
                fd_threshold,
                design: DesignConfig {
                    group_column: "diagnosis".to_string(),
                    control_label: control_id,
                    scanner: scanner_col.is_some(),
                    sequence: sequence_col.is_some(),
                    medication: medication_col.is_some(),
                },
                glm: GlmConfig { parallel, cores },
                alpha,
            };
            run_pipeline(&config)?;
        }
    }
    Ok(())
}
