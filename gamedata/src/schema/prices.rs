pub const URL: &str = "https://api.scrytracker.net/v1/prices/daily";

#[derive(serde::Deserialize)]
pub struct Prices {
	pub payload: Payload,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
	pub previous_day: Vec<Entry>,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
	pub name: String,
	pub median_price: f32,
}
