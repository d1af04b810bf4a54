//! Command line options.

use clap::Parser;

/// harrow - fast regex search over files and archives.
#[derive(Debug, Parser)]
#[command(name = "harrow", version, about)]
pub struct Args {
    /// The regex pattern to search for.
    pub pattern: String,

    /// Files to search; reads stdin when empty.
    pub files: Vec<std::path::PathBuf>,

    /// Case-insensitive matching.
    #[arg(short = 'i', long)]
    pub ignore_case: bool,

    /// Treat the pattern as a literal string.
    #[arg(short = 'F', long)]
    pub fixed_strings: bool,

    /// Dot matches newline.
    #[arg(long)]
    pub dotall: bool,

    /// Free-spacing pattern syntax with # comments.
    #[arg(short = 'x', long)]
    pub extended: bool,

    /// Search inside compressed files and archives.
    #[arg(short = 'z', long)]
    pub decompress: bool,

    /// Nested decompression depth (implies -z).
    #[arg(long, default_value_t = 1)]
    pub zmax: usize,

    /// Only print the number of matches.
    #[arg(short = 'c', long)]
    pub count: bool,

    /// Emit one JSON object per match.
    #[arg(long)]
    pub json: bool,

    /// Show byte offsets alongside line and column.
    #[arg(short = 'b', long)]
    pub byte_offset: bool,

    /// Also report negated (?^...) matches.
    #[arg(long)]
    pub redo: bool,
}

impl Args {
    /// Pattern compile options implied by the flags.
    pub fn pattern_options(&self) -> harrow_compiler::PatternOptions {
        let mut opts = harrow_compiler::PatternOptions::default();
        opts.i = self.ignore_case;
        opts.q = self.fixed_strings;
        opts.s = self.dotall;
        opts.x = self.extended;
        // ^ and $ match per line, grep-style
        opts.m = true;
        opts
    }

    pub fn effective_zmax(&self) -> usize {
        if self.decompress || self.zmax > 1 {
            self.zmax.clamp(1, 9)
        } else {
            0
        }
    }
}
