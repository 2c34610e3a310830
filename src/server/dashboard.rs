/// Dashboard page: sidebar, best pace chart and chat widget. Data comes from the JSON routes.
pub const PAGE: &str = include_str!("../../static/dashboard.html");
