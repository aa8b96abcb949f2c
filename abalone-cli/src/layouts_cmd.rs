//! Layouts command - print the built-in starting layouts

use anyhow::Result;
use clap::Args;

use abalone_core::{BoardLayout, LayoutFile};

#[derive(Args)]
pub struct LayoutsArgs {
    /// Only this layout
    #[arg(long)]
    pub layout: Option<BoardLayout>,

    /// Print as layout-file JSON instead of a board diagram
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: LayoutsArgs) -> Result<()> {
    let layouts: Vec<BoardLayout> = match args.layout {
        Some(layout) => vec![layout],
        None => BoardLayout::ALL.to_vec(),
    };

    for layout in layouts {
        if args.json {
            let file = LayoutFile {
                name: Some(layout.name().to_string()),
                rows: layout.rows(),
            };
            println!("{}", serde_json::to_string(&file)?);
        } else {
            println!("{}:\n{}", layout.name(), layout.setup_board());
        }
    }
    Ok(())
}
