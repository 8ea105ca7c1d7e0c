//! Realistic values for well-known field kinds, backed by `fake`.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use fake::Fake;
use fake::faker::address::en::{BuildingNumber, CityName, CountryName, StateName, StreetName, ZipCode};
use fake::faker::company::en::CompanyName;
use fake::faker::internet::en::{DomainSuffix, IPv4, SafeEmail, Username};
use fake::faker::job::en::Title as JobTitle;
use fake::faker::lorem::en::{Paragraph, Sentence, Word, Words};
use fake::faker::name::en::{FirstName, LastName, Name};
use fake::faker::phone_number::en::PhoneNumber;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde_json::Value;

use datafill_core::DataType;

use crate::errors::StrategyError;
use crate::generators::primitives::{fake_rng, fit_text, random_date};
use crate::generators::{GeneratedValue, Generator, GeneratorContext, GeneratorRegistry};
use crate::params::validate_params;

#[derive(Clone, Copy, Debug)]
enum FakeKind {
    FirstName,
    LastName,
    FullName,
    Email,
    Phone,
    Username,
    StreetAddress,
    City,
    State,
    Country,
    PostalCode,
    Company,
    JobTitle,
    Url,
    IpAddress,
    Title,
    Sentence,
    Paragraph,
}

/// Text generator for one `fake` field kind.
struct FakeTextGenerator {
    id: &'static str,
    aliases: &'static [&'static str],
    kind: FakeKind,
}

const FAKE_GENERATORS: &[FakeTextGenerator] = &[
    FakeTextGenerator { id: "person.first_name", aliases: &["first_name", "firstname"], kind: FakeKind::FirstName },
    FakeTextGenerator { id: "person.last_name", aliases: &["last_name", "lastname", "surname"], kind: FakeKind::LastName },
    FakeTextGenerator { id: "person.full_name", aliases: &["full_name", "name"], kind: FakeKind::FullName },
    FakeTextGenerator { id: "internet.email", aliases: &["email"], kind: FakeKind::Email },
    FakeTextGenerator { id: "phone.number", aliases: &["phone", "phone_number"], kind: FakeKind::Phone },
    FakeTextGenerator { id: "internet.username", aliases: &["username"], kind: FakeKind::Username },
    FakeTextGenerator { id: "address.street", aliases: &["street_address", "address"], kind: FakeKind::StreetAddress },
    FakeTextGenerator { id: "address.city", aliases: &["city"], kind: FakeKind::City },
    FakeTextGenerator { id: "address.state", aliases: &["state"], kind: FakeKind::State },
    FakeTextGenerator { id: "address.country", aliases: &["country"], kind: FakeKind::Country },
    FakeTextGenerator { id: "address.postal_code", aliases: &["postal_code", "zip"], kind: FakeKind::PostalCode },
    FakeTextGenerator { id: "company.name", aliases: &["company"], kind: FakeKind::Company },
    FakeTextGenerator { id: "job.title", aliases: &["job_title"], kind: FakeKind::JobTitle },
    FakeTextGenerator { id: "internet.url", aliases: &["url"], kind: FakeKind::Url },
    FakeTextGenerator { id: "internet.ip_address", aliases: &["ip_address", "ip"], kind: FakeKind::IpAddress },
    FakeTextGenerator { id: "text.title", aliases: &["title"], kind: FakeKind::Title },
    FakeTextGenerator { id: "text.sentence", aliases: &["sentence"], kind: FakeKind::Sentence },
    FakeTextGenerator { id: "text.paragraph", aliases: &["paragraph", "description"], kind: FakeKind::Paragraph },
];

pub fn register(registry: &mut GeneratorRegistry) {
    for generator in FAKE_GENERATORS {
        registry.register_generator(Box::new(FakeTextGenerator {
            id: generator.id,
            aliases: generator.aliases,
            kind: generator.kind,
        }));
    }
    registry.register_generator(Box::new(DateOfBirthGenerator));
    registry.register_generator(Box::new(IsbnGenerator));
}

impl FakeKind {
    fn sample(self, rng: &mut ChaCha8Rng) -> String {
        match self {
            FakeKind::FirstName => FirstName().fake_with_rng(rng),
            FakeKind::LastName => LastName().fake_with_rng(rng),
            FakeKind::FullName => Name().fake_with_rng(rng),
            FakeKind::Email => SafeEmail().fake_with_rng(rng),
            FakeKind::Phone => PhoneNumber().fake_with_rng(rng),
            FakeKind::Username => Username().fake_with_rng(rng),
            FakeKind::StreetAddress => {
                let number: String = BuildingNumber().fake_with_rng(rng);
                let street: String = StreetName().fake_with_rng(rng);
                format!("{number} {street}")
            }
            FakeKind::City => CityName().fake_with_rng(rng),
            FakeKind::State => StateName().fake_with_rng(rng),
            FakeKind::Country => CountryName().fake_with_rng(rng),
            FakeKind::PostalCode => ZipCode().fake_with_rng(rng),
            FakeKind::Company => CompanyName().fake_with_rng(rng),
            FakeKind::JobTitle => JobTitle().fake_with_rng(rng),
            FakeKind::Url => {
                let host: String = Word().fake_with_rng(rng);
                let suffix: String = DomainSuffix().fake_with_rng(rng);
                let path: String = Word().fake_with_rng(rng);
                format!("https://www.{host}.{suffix}/{path}")
            }
            FakeKind::IpAddress => IPv4().fake_with_rng(rng),
            FakeKind::Title => {
                let words: Vec<String> = Words(2..6).fake_with_rng(rng);
                words
                    .iter()
                    .map(|word| capitalize(word))
                    .collect::<Vec<_>>()
                    .join(" ")
            }
            FakeKind::Sentence => Sentence(4..10).fake_with_rng(rng),
            FakeKind::Paragraph => Paragraph(1..3).fake_with_rng(rng),
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl Generator for FakeTextGenerator {
    fn id(&self) -> &'static str {
        self.id
    }

    fn aliases(&self) -> &'static [&'static str] {
        self.aliases
    }

    fn generate(
        &self,
        ctx: &GeneratorContext<'_>,
        params: Option<&Value>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<GeneratedValue, StrategyError> {
        validate_params(params, &[], self.id)?;
        let mut fake_rng = fake_rng(rng);
        let value = self.kind.sample(&mut fake_rng);
        Ok(GeneratedValue::Text(fit_text(
            value,
            ctx.column.data_type.max_chars(),
        )))
    }
}

struct DateOfBirthGenerator;

impl Generator for DateOfBirthGenerator {
    fn id(&self) -> &'static str {
        "person.date_of_birth"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["date_of_birth", "birth_date", "dob"]
    }

    fn generate(
        &self,
        ctx: &GeneratorContext<'_>,
        params: Option<&Value>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<GeneratedValue, StrategyError> {
        validate_params(params, &[], self.id())?;
        let start = NaiveDate::from_ymd_opt(1940, 1, 1).unwrap_or_default();
        let end = NaiveDate::from_ymd_opt(2005, 12, 31).unwrap_or_default();
        let date = random_date(rng, start, end);
        Ok(match ctx.column.data_type {
            DataType::Timestamp => {
                GeneratedValue::Timestamp(NaiveDateTime::new(date, NaiveTime::MIN))
            }
            _ => GeneratedValue::Date(date),
        })
    }
}

/// ISBN-13 with the `978` prefix and a valid check digit.
struct IsbnGenerator;

fn isbn13_check_digit(digits: &[u8]) -> u8 {
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(idx, digit)| u32::from(*digit) * if idx % 2 == 0 { 1 } else { 3 })
        .sum();
    ((10 - sum % 10) % 10) as u8
}

impl Generator for IsbnGenerator {
    fn id(&self) -> &'static str {
        "book.isbn"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["isbn"]
    }

    fn generate(
        &self,
        ctx: &GeneratorContext<'_>,
        params: Option<&Value>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<GeneratedValue, StrategyError> {
        validate_params(params, &[], self.id())?;
        let mut digits = vec![9_u8, 7, 8];
        digits.extend((0..9).map(|_| rng.random_range(0..10_u8)));
        digits.push(isbn13_check_digit(&digits));
        let value: String = digits.iter().map(|digit| char::from(b'0' + digit)).collect();
        Ok(GeneratedValue::Text(fit_text(
            value,
            ctx.column.data_type.max_chars(),
        )))
    }
}
