use clap::builder::Styles;
use clap::builder::styling::AnsiColor;

/// Help colors: green bold headings, cyan flags and placeholders, red errors.
pub fn cli_styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Green.on_default().bold())
		.usage(AnsiColor::Green.on_default().bold())
		.literal(AnsiColor::Cyan.on_default())
		.placeholder(AnsiColor::Cyan.on_default())
		.error(AnsiColor::Red.on_default().bold())
		.invalid(AnsiColor::Yellow.on_default())
}
