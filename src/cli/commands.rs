use clap::{ArgAction, Subcommand};

#[derive(Subcommand)]
pub enum FlagCommands {
    /// Create a release flag
    Create {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Flag name
        #[arg(long)]
        name: String,

        /// Share of pilots enrolled, 0 to 100
        #[arg(long, default_value_t = 0)]
        percentage: i32,

        /// Endpoint that decides enrollment instead of the percentage
        #[arg(long)]
        decision_logic_api: Option<String>,

        /// Seed for pilot bucketing (picked automatically when omitted)
        #[arg(long)]
        rand_seed: Option<i64>,
    },

    /// List release flags
    List {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Update a release flag
    Update {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Name of the flag to update
        #[arg(long)]
        name: String,

        /// New rollout percentage
        #[arg(long)]
        percentage: Option<i32>,

        /// New decision endpoint; pass an empty string to remove it
        #[arg(long)]
        decision_logic_api: Option<String>,

        /// New seed, reshuffles which pilots are enrolled
        #[arg(long)]
        rand_seed: Option<i64>,
    },

    /// Delete a release flag with its pilots and allow-list
    Delete {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Name of the flag to delete
        #[arg(long)]
        name: String,
    },
}

#[derive(Subcommand)]
pub enum PilotCommands {
    /// Enroll or exclude a pilot regardless of the flag's strategy
    Set {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Flag name
        #[arg(long)]
        flag: String,

        /// External id of the pilot
        #[arg(long)]
        pilot: String,

        /// Whether the pilot is enrolled
        #[arg(long, action = ArgAction::Set, default_value_t = true)]
        enrolled: bool,
    },

    /// Remove a pilot override
    Unset {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Flag name
        #[arg(long)]
        flag: String,

        /// External id of the pilot
        #[arg(long)]
        pilot: String,
    },

    /// List pilot overrides of a flag
    List {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Flag name
        #[arg(long)]
        flag: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
