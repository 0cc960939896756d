use crate::infra::{build_service, ApiService, Backends};
use clap::Args;
use estate::config::AppConfig;
use estate::error::AppError;
use estate::workflows::estate::{
    EstateServiceError, InquirySubmission, InvestmentInputs, NewOffer, NewPartner, NewProperty,
    NewSalesperson, OfferState, PropertyAction, PropertyAddress, PropertyFeatures, PropertyView,
    ReferenceId, RentalInputs, StageCatalog,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Skip the website inquiry portion of the demo.
    #[arg(long)]
    pub(crate) skip_inquiry: bool,
}

/// Sample listings assigned to a demo salesperson.
pub(crate) fn seed_listings(service: &ApiService) -> Result<Vec<PropertyView>, EstateServiceError> {
    let agent = service.register_salesperson(NewSalesperson {
        name: "Dana Whitfield".to_string(),
        email: Some("dana.whitfield@agency.example.com".to_string()),
    })?;

    let listings = vec![
        NewProperty {
            name: "Lakeshore Bungalow".to_string(),
            expected_price: 100_000.0,
            description: Some("Two-bedroom bungalow a short walk from the water.".to_string()),
            address: PropertyAddress {
                street: Some("14 Shoreline Drive".to_string()),
                city: Some("Clear Lake".to_string()),
                postcode: Some("50428".to_string()),
                country_code: Some("US".to_string()),
                ..PropertyAddress::default()
            },
            features: Some(PropertyFeatures {
                living_area: 95,
                garden: true,
                garden_area: 100,
                ..PropertyFeatures::default()
            }),
            website_published: true,
            property_type: Some(ReferenceId::from("type_house")),
            salesperson: Some(agent.id.clone()),
            utilities: vec![
                ReferenceId::from("utility_electric"),
                ReferenceId::from("utility_water"),
            ],
            ..NewProperty::default()
        },
        NewProperty {
            name: "Downtown Loft".to_string(),
            expected_price: 185_000.0,
            address: PropertyAddress {
                city: Some("Des Moines".to_string()),
                ..PropertyAddress::default()
            },
            features: Some(PropertyFeatures {
                bedrooms: 1,
                living_area: 70,
                ..PropertyFeatures::default()
            }),
            website_published: true,
            property_type: Some(ReferenceId::from("type_apartment")),
            salesperson: Some(agent.id.clone()),
            tags: vec![ReferenceId::from("tag_renovated")],
            ..NewProperty::default()
        },
        NewProperty {
            name: "Mill Street Duplex".to_string(),
            expected_price: 140_000.0,
            investment: InvestmentInputs {
                purchase_price: 50_000.0,
                arv: 100_000.0,
                rehab_cost: 20_000.0,
                closing_costs: 5_000.0,
                holding_costs: 1_500.0,
            },
            rental: RentalInputs {
                monthly_rent: 1_500.0,
                monthly_expenses: 400.0,
            },
            property_type: Some(ReferenceId::from("type_multi_family")),
            salesperson: Some(agent.id),
            tags: vec![
                ReferenceId::from("tag_fixer_upper"),
                ReferenceId::from("tag_investment"),
            ],
            ..NewProperty::default()
        },
    ];

    listings
        .into_iter()
        .map(|listing| service.create_property(listing))
        .collect()
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    config.notifications.crm_enabled = true;
    if config.website.base_url.is_none() {
        config.website.base_url = Some("https://homes.example.com".to_string());
    }

    let (service, backends) = build_service(&config);
    let summary = walk_through(&service, &backends, args.skip_inquiry)?;
    println!(
        "\nDone: {} sold, {} offer(s) refused, {} lead(s), {} email(s).",
        summary.sold, summary.refused_offers, summary.leads, summary.emails
    );
    Ok(())
}

#[derive(Debug, Default)]
pub(crate) struct DemoSummary {
    pub(crate) sold: usize,
    pub(crate) refused_offers: usize,
    pub(crate) leads: usize,
    pub(crate) emails: usize,
}

pub(crate) fn walk_through(
    service: &ApiService,
    backends: &Backends,
    skip_inquiry: bool,
) -> Result<DemoSummary, EstateServiceError> {
    let mut summary = DemoSummary::default();

    println!("Estate pipeline demo");
    let listings = seed_listings(service)?;
    for view in &listings {
        println!(
            "- Listed {} at {:.2} ({} / {})",
            view.property.name,
            view.property.expected_price,
            view.state_label,
            view.stage_summary.name
        );
    }

    let bungalow = listings[0].property.id.clone();
    let first = service.register_partner(NewPartner {
        name: "Ari Novak".to_string(),
        email: Some("ari.novak@example.com".to_string()),
        phone: None,
    })?;
    let second = service.register_partner(NewPartner {
        name: "Bo Lindqvist".to_string(),
        email: Some("bo.lindqvist@example.com".to_string()),
        phone: Some("+1 515 555 0142".to_string()),
    })?;

    println!("\nOffers on {}", listings[0].property.name);
    let mut winning = None;
    for (partner, price) in [(&first, 95_000.0), (&second, 98_000.0)] {
        let offer = service.create_offer(
            &bungalow,
            NewOffer {
                partner_id: partner.id.clone(),
                price,
                validity: 7,
                date_deadline: None,
            },
        )?;
        println!(
            "- {} offered {:.2}, valid until {}",
            partner.name, offer.offer.price, offer.offer.date_deadline
        );
        winning = Some(offer.offer.id);
    }
    match service.create_offer(
        &bungalow,
        NewOffer {
            partner_id: first.id.clone(),
            price: 97_000.0,
            validity: 7,
            date_deadline: None,
        },
    ) {
        Ok(_) => println!("- Unexpected: a lower counter-offer was recorded"),
        Err(err) => println!("- Lower counter-offer rejected: {err}"),
    }

    let view = service.property(&bungalow)?;
    println!(
        "  Best price {:.2}, state {}",
        view.best_price, view.state_label
    );

    if let Some(offer_id) = winning {
        service.accept_offer(&offer_id)?;
    }
    let view = service.property(&bungalow)?;
    summary.refused_offers = view
        .offers
        .iter()
        .filter(|offer| offer.offer.state == OfferState::Refused)
        .count();
    println!(
        "  Accepted: selling price {:.2}, {} other offer(s) refused, stage {}",
        view.property.selling_price, summary.refused_offers, view.stage_summary.name
    );

    let view = service.apply_action(&bungalow, PropertyAction::Sold)?;
    println!("  Closed: {} ({})", view.state_label, view.stage_summary.name);
    summary.sold += 1;

    let duplex = &listings[2];
    println!("\nInvestment view for {}", duplex.property.name);
    println!(
        "- Total investment {:.2}, potential profit {:.2}, ROI {:.2}%",
        duplex.investment_metrics.total_investment,
        duplex.investment_metrics.potential_profit,
        duplex.investment_metrics.roi_percentage
    );
    println!(
        "- Cash flow {:.2}/month, {:.2}/year, cap rate {:.2}%",
        duplex.rental_metrics.monthly_cash_flow,
        duplex.rental_metrics.annual_cash_flow,
        duplex.rental_metrics.cap_rate
    );

    if !skip_inquiry {
        let loft = &listings[1];
        println!("\nWebsite inquiry on {}", loft.property.name);
        let confirmation = service.submit_inquiry(
            &loft.property.id,
            InquirySubmission {
                name: Some("Casey Ortiz".to_string()),
                email: Some("casey.ortiz@example.com".to_string()),
                phone: None,
                message: Some("Is parking included?\nAvailable for a viewing on Friday.".to_string()),
            },
        )?;
        println!("- {}", confirmation.message);
        summary.leads = backends.crm.as_ref().map_or(0, |crm| crm.leads().len());
        summary.emails = backends.notifier.outbox().len();
        println!(
            "- CRM leads: {} | salesperson emails: {}",
            summary.leads, summary.emails
        );
    }

    println!("\nPipeline");
    for column in service.pipeline()? {
        let names: Vec<_> = column
            .properties
            .iter()
            .map(|card| card.name.as_str())
            .collect();
        println!(
            "- {:<16} {} {}",
            column.stage.name,
            names.len(),
            if names.is_empty() {
                String::new()
            } else {
                format!("({})", names.join(", "))
            }
        );
    }

    Ok(summary)
}

pub(crate) fn run_stages() {
    let catalog = StageCatalog::standard();
    println!("{:<4} {:<16} {:<16} folded", "seq", "stage", "key");
    for stage in catalog.ordered() {
        println!(
            "{:<4} {:<16} {:<16} {}",
            stage.sequence,
            stage.name,
            stage.key.as_str(),
            if stage.fold { "yes" } else { "no" }
        );
    }
}
