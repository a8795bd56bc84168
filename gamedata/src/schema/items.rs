pub const URL: &str = "https://api.scrytracker.net/v1/items";

#[derive(serde::Deserialize)]
pub struct Items {
	pub data: Vec<Item>,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
	pub name: String,
	pub rarity: Option<String>,
}
