//! Filter execution over order batches

use tenderwatch_ingest::filter::{Filter, FilterDefinitions, PatternSet};
use tenderwatch_ingest::Order;

fn order(id: usize, name: &str, okdp: &str, okpd: &str, organisation: &str) -> Order {
    let mut fields = vec![String::new(); 17];
    fields[0] = "44-ФЗ".to_string();
    fields[1] = format!("№{}", id);
    fields[3] = name.to_string();
    fields[6] = "1000".to_string();
    fields[7] = "RUB".to_string();
    fields[8] = okdp.to_string();
    fields[9] = okpd.to_string();
    fields[10] = organisation.to_string();
    Order::from_fields(&fields)
}

fn batch() -> Vec<Order> {
    vec![
        order(0, "Поставка бумаги", "2109020", "17.12", "Школа №1"),
        order(1, "Ремонт кровли", "4520000", "43.91", "Администрация"),
        order(2, "Поставка мебели", "3612000", "31.01", "Школа №2"),
        order(3, "Охрана объекта", "7492000", "80.10", "Больница"),
        order(4, "Поставка картриджей", "3000000", "26.20", "Почта"),
        order(5, "Ремонт дороги", "4530000", "42.11", "Администрация"),
        order(6, "Поставка продуктов", "1500000", "10.89", "Детский сад"),
        order(7, "Уборка территории", "9000000", "81.29", "Парк"),
        order(8, "Вывоз мусора", "9000000", "38.11", "Администрация"),
        order(9, "Поставка топлива", "2320000", "19.20", "Котельная"),
    ]
}

fn ids(orders: &[Order]) -> Vec<&str> {
    orders.iter().map(|o| o.order_id.as_str()).collect()
}

#[test]
fn test_all_set_matches_any_field() {
    let mut definitions = FilterDefinitions::default();
    // name, OKDP and organisation matches
    definitions.all = PatternSet::new(["^Охрана", "^4530", "Котельная"]);
    let filter = Filter::compile(&definitions).unwrap();

    let (kept, removed) = filter.execute(batch());
    assert_eq!(kept.len(), 7);
    assert!((removed - 0.3).abs() < 1e-6);
    assert_eq!(ids(&kept), vec!["0", "1", "2", "4", "6", "7", "8"]);
}

#[test]
fn test_field_sets_only_match_their_field() {
    let definitions = FilterDefinitions {
        order_name: PatternSet::new(["Администрация"]),
        okpd: PatternSet::new(["^43\\."]),
        organisation_name: PatternSet::new(["^Школа"]),
        ..Default::default()
    };
    let filter = Filter::compile(&definitions).unwrap();

    let (kept, _) = filter.execute(batch());
    // "Администрация" is an organisation, not an order name
    assert_eq!(ids(&kept), vec!["3", "4", "5", "6", "7", "8", "9"]);
}

#[test]
fn test_empty_filter_keeps_everything() {
    let filter = Filter::compile(&FilterDefinitions::default()).unwrap();
    let (kept, removed) = filter.execute(batch());
    assert_eq!(kept.len(), 10);
    assert_eq!(removed, 0.0);
}

#[test]
fn test_everything_removed() {
    let definitions = FilterDefinitions {
        all: PatternSet::new(["."]),
        ..Default::default()
    };
    let (kept, removed) = Filter::compile(&definitions).unwrap().execute(batch());
    assert!(kept.is_empty());
    assert_eq!(removed, 1.0);
}

#[test]
fn test_clear_example() {
    let mut set = PatternSet::new(["foo", "foo", "[invalid"]);
    set.clear();
    assert_eq!(set.patterns(), ["foo".to_string()]);
}
