//! HTML price board scrape, used when the JSON API is unreachable.

use std::collections::HashMap;

const URL: &str = "https://scrytracker.net/board";

/// Scrape the public price board into a `Data` set.
///
/// The board only carries names and prices, so rarity flags stay empty.
pub fn scraped() -> Result<crate::Data, anyhow::Error> {
	let html = ureq::get(URL)
		.call()?
		.body_mut()
		.read_to_string()?;

	let regex = regex::Regex::new(r"<tr><td>(?<name>[^<]+)</td><td>(?<price>\d+)</td>")?;

	let mut prices = HashMap::new();
	for cap in regex.captures_iter(&html) {
		let (Some(name), Some(price)) = (cap.name("name"), cap.name("price")) else {
			continue;
		};
		let Ok(price) = price.as_str().parse::<u32>() else {
			continue;
		};
		prices.insert(name.as_str().to_string(), price);
	}

	let mut data = crate::Data::default();
	data.item_names.extend(prices.keys().cloned());
	data.market_prices = prices;
	Ok(data)
}
