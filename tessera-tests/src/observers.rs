use crate::{config, silent_logs};
use std::sync::{Arc, Mutex};
use tessera::{
    Database, Driver, Error, Event, Filter, ModelExtension, ModelOptions, Observer, ObserverFn,
    Result, Value, Values,
    future::{self, BoxFuture},
    values,
};

#[derive(Default, Clone)]
struct Recorder(Arc<Mutex<Vec<String>>>);

impl Recorder {
    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

impl<D: Driver> Observer<D> for Recorder {
    fn notify<'a>(&'a self, event: &'a Event<'a, D>) -> BoxFuture<'a, Result<()>> {
        self.0
            .lock()
            .unwrap()
            .push(format!("{} {}", event.name(), event.model.identity()));
        Box::pin(future::ready(Ok(())))
    }
}

fn no_aim<D: Driver>(event: &Event<'_, D>) -> Result<()> {
    if event.model.identity() == "Agency"
        && event
            .values
            .iter()
            .any(|v| v.get("name") == Some(&Value::from("aim")))
    {
        return Err(Error::msg("AIM is not an agency"));
    }
    Ok(())
}

struct Shout;

impl ModelExtension for Shout {
    fn configure(&self, options: &mut ModelOptions) {
        options.limit = Some(2);
    }

    fn parse(&self, mut row: Values) -> Result<Values> {
        if let Some(Value::Varchar(Some(name))) = row.get_mut("name") {
            *name = name.to_uppercase();
        }
        Ok(row)
    }
}

pub async fn observers<D: Driver>(driver: D, url: &str) {
    let recorder = Recorder::default();
    let database = Database::builder(driver, config(url))
        .observe(recorder.clone())
        .observe(ObserverFn(no_aim::<D>))
        .extend("agency", Shout)
        .connect()
        .await
        .expect("Could not connect with observers");
    let account = database.model("Account").expect("Model Account is missing");
    let agency = database.model("Agency").expect("Model Agency is missing");

    // Extensions
    assert_eq!(agency.options().limit, Some(2));
    let agencies = agency.find(()).await.expect("Could not find the agencies");
    assert_eq!(
        agencies
            .iter()
            .map(|v| v.get_as::<String>("name").unwrap())
            .collect::<Vec<_>>(),
        ["SHIELD", "SWORD"]
    );
    assert_eq!(account.options().limit, Some(100));

    // Events around an operation
    recorder.take();
    account
        .find_one(1)
        .await
        .expect("Could not find steve")
        .expect("Steve is missing");
    assert_eq!(recorder.take(), ["before:findOne Account", "findOne Account"]);
    account
        .update(
            Filter::eq("account_group_id", 100),
            values! { "last_name" => "Contractor" },
        )
        .await
        .expect("Could not update the contractors");
    assert_eq!(recorder.take(), ["before:update Account", "update Account"]);

    // A failing observer aborts before the statement
    silent_logs! {
        let error = agency
            .create(values! { "name" => "aim" })
            .await
            .expect_err("AIM must be rejected");
        assert_eq!(error.to_string(), "While notifying `before:create` on `Agency`");
        assert_eq!(error.root_cause().to_string(), "AIM is not an agency");
    }
    assert!(!recorder.take().contains(&"create Agency".to_string()));
    assert_eq!(
        agency
            .count(Filter::eq("name", "aim"))
            .await
            .expect("Could not count the agencies"),
        0
    );
    agency
        .create(values! { "name" => "atlas" })
        .await
        .expect("Could not create atlas");
    assert_eq!(
        recorder.take(),
        [
            "before:count Agency",
            "count Agency",
            "before:create Agency",
            "create Agency"
        ]
    );

    database.close();
}
